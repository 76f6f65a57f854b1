//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! enums with explicit discriminants. JSON payloads cross the boundary as
//! serialized C strings so the host can hand them straight to its widget
//! library. Conversion functions live here to keep `lib.rs` focused on the
//! `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use schemaform_core::error::{BridgeError, SchemaError};
use schemaform_core::http::HttpMethod;
use serde_json::Value;

/// Opaque handle to an `HttpBridge`. C callers receive a pointer to this
/// and pass it back into every bridge function.
pub struct FfiBridge {
    pub(crate) inner: schemaform_core::HttpBridge,
}

/// Move a Rust string onto the C heap. Interior NUL bytes yield an empty
/// string rather than a panic.
pub(crate) fn to_c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
    Patch = 4,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
            HttpMethod::Patch => FfiHttpMethod::Patch,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `schemaform_build_*` functions. The C caller executes the request
/// and passes the response back through `schemaform_parse_response`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub path: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: schemaform_core::HttpRequest) -> *mut Self {
        let path = to_c_string(req.path);
        let body = match req.body {
            Some(b) => to_c_string(b),
            None => std::ptr::null_mut(),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: to_c_string(k),
                    value: to_c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            path,
            headers,
            headers_len,
            body,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this after executing a request, then passes a
/// pointer to `schemaform_parse_response`. The FFI layer reads but does not
/// free these fields. A null `body` is treated as empty.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    /// Non-2xx status; `http_status` is set and `error_message` carries the
    /// raw response body.
    Http = 1,
    Decode = 2,
    Encode = 3,
    Transport = 4,
    UnresolvedReference = 5,
    CyclicReference = 6,
    UnsupportedReference = 7,
    InvalidInput = 8,
    Panic = 9,
    NullArg = 10,
    SchemaTooLarge = 11,
}

/// Result envelope for every operation that yields JSON.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data` is a
/// JSON C string, or null when the operation produced no value (e.g. a
/// `204 No Content`). On failure `error_code` describes the category,
/// `error_message` is a C string, and `data` is null.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data: *mut c_char,
}

impl FfiResult {
    fn boxed(error_code: FfiErrorCode, message: Option<String>, http_status: u16, data: *mut c_char) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code,
            error_message: message.map(to_c_string).unwrap_or(std::ptr::null_mut()),
            http_status,
            data,
        }))
    }

    /// Build a success result carrying `value` as JSON, or no data.
    pub(crate) fn ok_json(value: Option<&Value>) -> *mut Self {
        let data = match value {
            Some(v) => to_c_string(v.to_string()),
            None => std::ptr::null_mut(),
        };
        Self::boxed(FfiErrorCode::Ok, None, 0, data)
    }

    /// Build an error result from a `BridgeError`.
    pub(crate) fn from_bridge_error(err: BridgeError) -> *mut Self {
        let code = match &err {
            BridgeError::Status { .. } => FfiErrorCode::Http,
            BridgeError::Decode(_) => FfiErrorCode::Decode,
            BridgeError::Encode(_) => FfiErrorCode::Encode,
            BridgeError::Transport(_) => FfiErrorCode::Transport,
        };
        let status = err.status().unwrap_or(0);
        let message = match err {
            BridgeError::Status { body, .. } => body,
            other => other.to_string(),
        };
        Self::boxed(code, Some(message), status, std::ptr::null_mut())
    }

    /// Build an error result from a `SchemaError`.
    pub(crate) fn from_schema_error(err: SchemaError) -> *mut Self {
        let code = match err {
            SchemaError::UnresolvedReference(_) => FfiErrorCode::UnresolvedReference,
            SchemaError::CyclicReference(_) => FfiErrorCode::CyclicReference,
            SchemaError::UnsupportedReference(_) => FfiErrorCode::UnsupportedReference,
            SchemaError::TooLarge { .. } => FfiErrorCode::SchemaTooLarge,
        };
        Self::boxed(code, Some(err.to_string()), 0, std::ptr::null_mut())
    }

    /// Build an error result for input that is not valid UTF-8 or JSON.
    pub(crate) fn invalid_input(msg: &str) -> *mut Self {
        Self::boxed(
            FfiErrorCode::InvalidInput,
            Some(format!("invalid input: {msg}")),
            0,
            std::ptr::null_mut(),
        )
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::boxed(
            FfiErrorCode::NullArg,
            Some(format!("null argument: {name}")),
            0,
            std::ptr::null_mut(),
        )
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::boxed(FfiErrorCode::Panic, Some(msg.to_string()), 0, std::ptr::null_mut())
    }
}
