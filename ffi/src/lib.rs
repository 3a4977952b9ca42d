//! C-ABI wrapper around `request-core`.
//!
//! # Overview
//! Lets a host whose HTTP client is native (a mobile or embedded platform)
//! reuse the request normalization and response resolution rules. The host
//! assembles a config, calls `req_build` to get the resolved request, runs it
//! on its own HTTP client, and feeds the load event back through
//! `req_resolve_response`. Transport errors stay on the host side.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - A single `FfiResult` envelope with `FfiDataTag` + `void* data`
//!   conveys success payloads and errors uniformly.
//! - The C caller owns all returned pointers and must call the matching
//!   `req_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use request_core::{resolve_response, HttpMethod, RequestBuilder, RequestConfig, TransportResponse};

use types::*;

/// Borrow a C string as UTF-8, treating invalid UTF-8 as absent.
unsafe fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

// ---------------------------------------------------------------------------
// Config lifecycle
// ---------------------------------------------------------------------------

/// Create a new request config for `url`.
///
/// `method` is one of `"GET"`, `"POST"`, `"PUT"`, `"DELETE"`; null means
/// `GET`. Returns null if `url` is null or the method is not supported.
/// The caller must free the returned pointer with `req_config_free`.
#[unsafe(no_mangle)]
pub extern "C" fn req_config_new(url: *const c_char, method: *const c_char) -> *mut FfiRequestConfig {
    catch_unwind(|| {
        let Some(url) = (unsafe { str_arg(url) }) else {
            return std::ptr::null_mut();
        };
        let method = if method.is_null() {
            HttpMethod::Get
        } else {
            match unsafe { str_arg(method) }.map(str::parse::<HttpMethod>) {
                Some(Ok(m)) => m,
                _ => {
                    log::warn!("req_config_new: unsupported method");
                    return std::ptr::null_mut();
                }
            }
        };
        let config = RequestConfig::new(url).method(method);
        Box::into_raw(Box::new(FfiRequestConfig { inner: config }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a config created by `req_config_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn req_config_free(config: *mut FfiRequestConfig) {
    if !config.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(config) });
        }));
    }
}

/// Run a builder step on `config`. Returns false on a null config or panic.
fn with_config(config: *mut FfiRequestConfig, f: impl FnOnce(&mut FfiRequestConfig) -> bool) -> bool {
    if config.is_null() {
        return false;
    }
    catch_unwind(AssertUnwindSafe(|| f(unsafe { &mut *config }))).unwrap_or(false)
}

/// Set the base URL used when the config's URL is relative.
#[unsafe(no_mangle)]
pub extern "C" fn req_config_set_base_url(config: *mut FfiRequestConfig, base_url: *const c_char) -> bool {
    with_config(config, |cfg| match unsafe { str_arg(base_url) } {
        Some(base_url) => {
            cfg.update(|c| c.base_url(base_url));
            true
        }
        None => false,
    })
}

/// Append a header. Headers keep the order they were added in.
#[unsafe(no_mangle)]
pub extern "C" fn req_config_add_header(
    config: *mut FfiRequestConfig,
    name: *const c_char,
    value: *const c_char,
) -> bool {
    with_config(config, |cfg| match unsafe { (str_arg(name), str_arg(value)) } {
        (Some(name), Some(value)) => {
            cfg.update(|c| c.header(name, value));
            true
        }
        _ => false,
    })
}

/// Replace the request data with the JSON document in `json`.
///
/// Returns false if `json` is null or not valid JSON. A valid document that
/// is not an object is accepted here and reported by `req_build` as a
/// construction error.
#[unsafe(no_mangle)]
pub extern "C" fn req_config_set_data_json(config: *mut FfiRequestConfig, json: *const c_char) -> bool {
    with_config(config, |cfg| {
        let Some(text) = (unsafe { str_arg(json) }) else {
            return false;
        };
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) => {
                cfg.update(|c| c.data(&value));
                true
            }
            Err(e) => {
                log::warn!("req_config_set_data_json: {e}");
                false
            }
        }
    })
}

/// Set the timeout in milliseconds. Zero is accepted here and rejected by
/// `req_build`.
#[unsafe(no_mangle)]
pub extern "C" fn req_config_set_timeout_ms(config: *mut FfiRequestConfig, timeout_ms: u64) -> bool {
    with_config(config, |cfg| {
        cfg.update(|c| c.timeout(Duration::from_millis(timeout_ms)));
        true
    })
}

// ---------------------------------------------------------------------------
// Build and resolve
// ---------------------------------------------------------------------------

/// Resolve a config into the request the host should send.
///
/// Returns a result with `data_tag = Request` on success, or
/// `error_code = Construction` when the data cannot be encoded.
#[unsafe(no_mangle)]
pub extern "C" fn req_build(config: *const FfiRequestConfig) -> *mut FfiResult {
    if config.is_null() {
        return FfiResult::null_arg("config");
    }
    catch_unwind(AssertUnwindSafe(|| {
        let config = unsafe { &*config };
        match RequestBuilder::build(&config.inner) {
            Ok(req) => {
                log::info!("({}) {}", req.method, req.url);
                FfiResult::ok_request(req)
            }
            Err(e) => {
                log::error!("req_build: {e}");
                FfiResult::from_error(e)
            }
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in req_build"))
}

/// Resolve the host's load event into a response value.
///
/// Returns `data_tag = Json` when the content type declares JSON and the
/// body parses, `data_tag = Text` for any other content type, and
/// `error_code = InvalidJson` when declared JSON does not parse.
#[unsafe(no_mangle)]
pub extern "C" fn req_resolve_response(response: *const FfiHttpResponse) -> *mut FfiResult {
    catch_unwind(|| {
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let resp = unsafe { &*response };
        let mut core_resp = TransportResponse::new(
            resp.status,
            unsafe { str_arg(resp.body) }.unwrap_or(""),
        );
        if let Some(content_type) = unsafe { str_arg(resp.content_type) } {
            core_resp = core_resp.with_header("Content-Type", content_type);
        }
        match resolve_response(core_resp) {
            Ok(body) => FfiResult::ok_body(body),
            Err(e) => FfiResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in req_resolve_response"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

fn free_resolved_request(req: Box<FfiResolvedRequest>) {
    if !req.url.is_null() {
        drop(unsafe { CString::from_raw(req.url) });
    }
    if !req.body.is_null() {
        drop(unsafe { CString::from_raw(req.body) });
    }
    if !req.headers.is_null() && req.headers_len > 0 {
        let headers = unsafe {
            Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                req.headers,
                req.headers_len as usize,
            ))
        };
        for h in headers.iter() {
            if !h.key.is_null() {
                drop(unsafe { CString::from_raw(h.key) });
            }
            if !h.value.is_null() {
                drop(unsafe { CString::from_raw(h.value) });
            }
        }
    }
}

/// Free an `FfiResult` returned by `req_build` or `req_resolve_response`.
/// Safe to call with null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn req_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.data.is_null() {
            match result.data_tag {
                FfiDataTag::Request => {
                    free_resolved_request(unsafe { Box::from_raw(result.data as *mut FfiResolvedRequest) });
                }
                FfiDataTag::Json | FfiDataTag::Text => {
                    drop(unsafe { CString::from_raw(result.data as *mut c_char) });
                }
                FfiDataTag::None => {}
            }
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn req_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
