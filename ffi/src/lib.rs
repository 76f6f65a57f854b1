//! C-ABI wrapper around `schemaform-core`.
//!
//! # Overview
//! Exposes schema resolution, field metadata extraction, and the request /
//! response half of the HTTP bridge through `extern "C"` functions, so a host
//! written in any language with a C FFI can drive schema forms while doing
//! the network I/O itself.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - JSON goes in and out as C strings. A single `FfiResult` envelope carries
//!   either a JSON payload or an error code, message and HTTP status.
//! - The C caller owns all returned pointers and must call the matching
//!   `schemaform_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;

use schemaform_core::http::{HttpMethod, HttpResponse};
use schemaform_core::metadata::{FieldMetadata, UiHints};
use schemaform_core::persist::storage_key;
use serde_json::Value;

use types::*;

/// Borrow a C string as `&str`. Null or invalid UTF-8 yields `None`.
fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Parse a nullable method name such as `"PUT"`.
fn read_method(ptr: *const c_char) -> Result<Option<HttpMethod>, ()> {
    match read_str(ptr) {
        None if ptr.is_null() => Ok(None),
        None => Err(()),
        Some(name) => name.parse().map(Some).map_err(|_| ()),
    }
}

/// Parse a JSON C string, or produce the error envelope to return.
fn read_json(ptr: *const c_char, name: &str) -> Result<Value, *mut FfiResult> {
    if ptr.is_null() {
        return Err(FfiResult::null_arg(name));
    }
    let text = read_str(ptr).ok_or_else(|| FfiResult::invalid_input("not UTF-8"))?;
    serde_json::from_str(text).map_err(|e| FfiResult::invalid_input(&e.to_string()))
}

// ---------------------------------------------------------------------------
// Bridge lifecycle
// ---------------------------------------------------------------------------

/// Create a new bridge bound to `resource_url`.
///
/// Returns null if `resource_url` is null or if an internal panic occurs.
/// The caller must free the returned pointer with `schemaform_bridge_free`.
#[unsafe(no_mangle)]
pub extern "C" fn schemaform_bridge_new(resource_url: *const c_char) -> *mut FfiBridge {
    catch_unwind(|| {
        if resource_url.is_null() {
            return std::ptr::null_mut();
        }
        let url = read_str(resource_url).unwrap_or("");
        let bridge = schemaform_core::HttpBridge::new(url);
        Box::into_raw(Box::new(FfiBridge { inner: bridge }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a bridge created by `schemaform_bridge_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn schemaform_bridge_free(bridge: *mut FfiBridge) {
    if !bridge.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(bridge) });
        });
    }
}

// ---------------------------------------------------------------------------
// Schema processing
// ---------------------------------------------------------------------------

/// Resolve every local `$ref` in `schema_json`.
///
/// On success `data` holds the self-contained schema. Reference failures map
/// to `UnresolvedReference`, `CyclicReference`, `UnsupportedReference` or
/// `SchemaTooLarge`.
#[unsafe(no_mangle)]
pub extern "C" fn schemaform_resolve_schema(schema_json: *const c_char) -> *mut FfiResult {
    catch_unwind(|| {
        let mut schema = match read_json(schema_json, "schema_json") {
            Ok(v) => v,
            Err(result) => return result,
        };
        match schemaform_core::resolve(&mut schema) {
            Ok(()) => FfiResult::ok_json(Some(&schema)),
            Err(e) => FfiResult::from_schema_error(e),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in schemaform_resolve_schema"))
}

/// Extract labels, helper text and UI hints from `schema_json` using the
/// default format hints.
///
/// On success `data` is `{"fields": {...}, "definitions": {...}}`.
#[unsafe(no_mangle)]
pub extern "C" fn schemaform_field_metadata(schema_json: *const c_char) -> *mut FfiResult {
    catch_unwind(|| {
        let schema = match read_json(schema_json, "schema_json") {
            Ok(v) => v,
            Err(result) => return result,
        };
        let metadata = FieldMetadata::extract(&schema, &UiHints::default());
        match serde_json::to_value(&metadata) {
            Ok(value) => FfiResult::ok_json(Some(&value)),
            Err(e) => FfiResult::invalid_input(&e.to_string()),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in schemaform_field_metadata"))
}

/// Storage key for a form: `"VERB path"`, or `path` alone when `method` is
/// null. Returns null if `path` is null or `method` is not a known verb.
/// Free the result with `schemaform_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn schemaform_storage_key(
    method: *const c_char,
    path: *const c_char,
) -> *mut c_char {
    catch_unwind(|| {
        let (Ok(verb), Some(path)) = (read_method(method), read_str(path)) else {
            return std::ptr::null_mut();
        };
        to_c_string(storage_key(verb, path))
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Build the schema fetch for `method` (e.g. `"POST"`). A null `method`
/// fetches the single-verb schema, without a `method` query.
///
/// Returns null if `bridge` is null or `method` is not a known verb.
/// The caller must free the returned pointer with `schemaform_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn schemaform_build_schema_request(
    bridge: *const FfiBridge,
    method: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if bridge.is_null() {
            return std::ptr::null_mut();
        }
        let bridge = unsafe { &*bridge };
        match read_method(method) {
            Ok(verb) => FfiHttpRequest::from_core(bridge.inner.schema_request(verb)),
            Err(()) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build the submission of `value_json` with `method`. `GET` requests carry
/// no body.
///
/// Returns null if any argument is null, `method` is unknown, or
/// `value_json` is not valid JSON.
#[unsafe(no_mangle)]
pub extern "C" fn schemaform_build_submit_request(
    bridge: *const FfiBridge,
    method: *const c_char,
    value_json: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if bridge.is_null() || method.is_null() || value_json.is_null() {
            return std::ptr::null_mut();
        }
        let bridge = unsafe { &*bridge };
        let Ok(Some(verb)) = read_method(method) else {
            return std::ptr::null_mut();
        };
        let Some(value) = read_str(value_json).and_then(|s| serde_json::from_str::<Value>(s).ok()) else {
            return std::ptr::null_mut();
        };
        match bridge.inner.submit_request(verb, &value) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    let body = read_str(resp.body).unwrap_or("");
    HttpResponse::new(resp.status, body)
}

/// Interpret a response to any request built by this bridge.
///
/// `204` or an empty 2xx body yields `Ok` with null `data`. Other 2xx bodies
/// are returned as JSON. Any other status yields `Http` with `http_status`
/// set and the raw body as `error_message`.
#[unsafe(no_mangle)]
pub extern "C" fn schemaform_parse_response(
    bridge: *const FfiBridge,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    catch_unwind(|| {
        if bridge.is_null() {
            return FfiResult::null_arg("bridge");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let bridge = unsafe { &*bridge };
        let resp = unsafe { &*response };
        match bridge.inner.interpret(ffi_response_to_core(resp)) {
            Ok(value) => FfiResult::ok_json(value.as_ref()),
            Err(e) => FfiResult::from_bridge_error(e),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in schemaform_parse_response"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by any `schemaform_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn schemaform_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        if !req.path.is_null() {
            drop(unsafe { CString::from_raw(req.path) });
        }
        if !req.body.is_null() {
            drop(unsafe { CString::from_raw(req.body) });
        }
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Vec::from_raw_parts(req.headers, req.headers_len as usize, req.headers_len as usize)
            };
            for h in headers {
                if !h.key.is_null() {
                    drop(unsafe { CString::from_raw(h.key) });
                }
                if !h.value.is_null() {
                    drop(unsafe { CString::from_raw(h.value) });
                }
            }
        }
    });
}

/// Free an `FfiResult`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn schemaform_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.data.is_null() {
            drop(unsafe { CString::from_raw(result.data) });
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn schemaform_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
