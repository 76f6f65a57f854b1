//! Generates `schemaform.h` into `OUT_DIR` from the `extern "C"` surface.

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into());
    let out_dir = env::var("OUT_DIR").unwrap_or_else(|_| ".".into());
    let header = PathBuf::from(out_dir).join("schemaform.h");

    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("SCHEMAFORM_H".into()),
        cpp_compat: true,
        ..Default::default()
    };

    // Header failures are reported as warnings only.
    match cbindgen::Builder::new()
        .with_crate(crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(&header);
        }
        Err(e) => println!("cargo:warning=cbindgen failed: {e}"),
    }
}
