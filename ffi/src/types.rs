//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! tagged enums with explicit discriminants. Conversion functions live here
//! to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use request_core::{Body, HttpMethod, RequestConfig, RequestError, ResolvedRequest, ResponseBody};

/// Opaque handle to a `RequestConfig` being assembled by the C caller.
pub struct FfiRequestConfig {
    pub(crate) inner: RequestConfig,
}

impl FfiRequestConfig {
    /// Applies a by-value builder step in place.
    pub(crate) fn update(&mut self, f: impl FnOnce(RequestConfig) -> RequestConfig) {
        let current = std::mem::replace(&mut self.inner, RequestConfig::new(""));
        self.inner = f(current);
    }
}

/// Copies `s` into a C string owned by the caller, dropping interior NULs.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    let bytes: Vec<u8> = s.into_bytes().into_iter().filter(|b| *b != 0).collect();
    CString::new(bytes).unwrap_or_default().into_raw()
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
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

/// How to interpret `FfiResolvedRequest::body`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiBodyKind {
    /// No body; `body` is null.
    None = 0,
    /// Send `body` as-is.
    Text = 1,
    /// `body` is a JSON object of fields the host encodes itself
    /// (e.g. as multipart).
    Fields = 2,
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// A resolved request described as C-compatible plain data.
///
/// The host opens its HTTP client with `method`/`url`/`timeout_ms`, sets the
/// headers in array order, sends `body`, and passes the response back
/// through `req_resolve_response`.
#[repr(C)]
pub struct FfiResolvedRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body_kind: FfiBodyKind,
    pub body: *mut c_char,
    pub timeout_ms: u64,
}

impl FfiResolvedRequest {
    pub(crate) fn from_core(req: ResolvedRequest) -> Box<Self> {
        let (body_kind, body) = match req.body {
            None => (FfiBodyKind::None, std::ptr::null_mut()),
            Some(Body::Text(text)) => (FfiBodyKind::Text, into_c_string(text)),
            Some(Body::Fields(fields)) => (
                FfiBodyKind::Fields,
                into_c_string(serde_json::Value::Object(fields).to_string()),
            ),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: into_c_string(k),
                    value: into_c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::new(FfiResolvedRequest {
            method: req.method.into(),
            url: into_c_string(req.url),
            headers,
            headers_len,
            body_kind,
            body,
            timeout_ms: req.timeout.as_millis() as u64,
        })
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// What the host's HTTP client delivered on its load event.
///
/// The C caller fills this in and passes a pointer to
/// `req_resolve_response`. The FFI layer reads but does not free these
/// fields. `content_type` may be null.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub content_type: *const c_char,
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
    Construction = 1,
    Transport = 2,
    InvalidJson = 3,
    Cancelled = 4,
    Panic = 5,
    NullArg = 6,
}

/// Tag that tells `req_free_result` what `FfiResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    /// `data` is an `FfiResolvedRequest`.
    Request = 1,
    /// `data` is a C string holding the parsed JSON, re-serialized.
    Json = 2,
    /// `data` is a C string holding the raw response text.
    Text = 3,
}

/// Result envelope for build and resolve operations.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the payload tagged by `data_tag`. On failure `error_code`
/// describes the category, `error_message` is a human-readable C string,
/// and `data` is null.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

impl FfiResult {
    fn boxed(error_code: FfiErrorCode, error_message: *mut c_char, data_tag: FfiDataTag, data: *mut c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code,
            error_message,
            data_tag,
            data,
        }))
    }

    pub(crate) fn ok_request(req: ResolvedRequest) -> *mut Self {
        let data = Box::into_raw(FfiResolvedRequest::from_core(req)) as *mut c_void;
        Self::boxed(FfiErrorCode::Ok, std::ptr::null_mut(), FfiDataTag::Request, data)
    }

    pub(crate) fn ok_body(body: ResponseBody) -> *mut Self {
        let (tag, text) = match body {
            ResponseBody::Json(value) => (FfiDataTag::Json, value.to_string()),
            ResponseBody::Text(text) => (FfiDataTag::Text, text),
        };
        Self::boxed(FfiErrorCode::Ok, std::ptr::null_mut(), tag, into_c_string(text) as *mut c_void)
    }

    pub(crate) fn from_error(err: RequestError) -> *mut Self {
        let error_code = match &err {
            RequestError::Construction(_) => FfiErrorCode::Construction,
            RequestError::Transport(_) => FfiErrorCode::Transport,
            RequestError::InvalidJson(_) => FfiErrorCode::InvalidJson,
            RequestError::Cancelled => FfiErrorCode::Cancelled,
        };
        Self::boxed(error_code, into_c_string(err.to_string()), FfiDataTag::None, std::ptr::null_mut())
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::boxed(
            FfiErrorCode::NullArg,
            into_c_string(format!("null argument: {name}")),
            FfiDataTag::None,
            std::ptr::null_mut(),
        )
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::boxed(
            FfiErrorCode::Panic,
            into_c_string(msg.to_string()),
            FfiDataTag::None,
            std::ptr::null_mut(),
        )
    }
}
