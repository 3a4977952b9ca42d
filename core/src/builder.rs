//! Turns a `RequestConfig` into a `ResolvedRequest` without any I/O.
//!
//! # Design
//! Resolution is pure: the same config always yields the same request, which
//! keeps every encoding rule testable without a transport. The method alone
//! decides where data goes. GET and DELETE put it in the query string, POST
//! and PUT encode it as the body according to the `Content-Type` header.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use crate::config::{json_kind, DataSlot, RequestConfig};
use crate::error::RequestError;
use crate::http::{
    find_header, Body, RequestData, ResolvedRequest, APPLICATION_JSON, CONTENT_TYPE,
    FORM_URLENCODED,
};

/// Characters left alone by URL-component encoding: alphanumerics plus
/// `- _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Stateless request resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestBuilder;

impl RequestBuilder {
    pub fn build(config: &RequestConfig) -> Result<ResolvedRequest, RequestError> {
        if config.timeout.is_zero() {
            return Err(RequestError::Construction(
                "timeout must be positive".to_string(),
            ));
        }
        let data = match &config.data {
            DataSlot::Ready(data) => data,
            DataSlot::Invalid(reason) => {
                return Err(RequestError::Construction(reason.clone()));
            }
        };

        let mut url = resolve_url(&config.url, &config.base_url);
        if !is_absolute(&url) {
            return Err(RequestError::Construction(format!(
                "URL `{url}` has no http or https scheme"
            )));
        }
        let body = if config.method.encodes_data_in_query() {
            let query = to_query_string(data)?;
            url = append_query(&url, &query);
            None
        } else {
            encode_body(data, find_header(&config.headers, CONTENT_TYPE))?
        };

        Ok(ResolvedRequest {
            method: config.method,
            url,
            headers: config.headers.clone(),
            body,
            timeout: config.timeout,
        })
    }
}

/// True when `url` carries an explicit `http:` or `https:` scheme.
pub fn is_absolute(url: &str) -> bool {
    match url.split_once(':') {
        Some((scheme, _)) => {
            scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
        }
        None => false,
    }
}

/// Absolute URLs are returned unchanged. Anything else is appended to
/// `base_url` with exactly one `/` between them.
pub fn resolve_url(url: &str, base_url: &str) -> String {
    if is_absolute(url) {
        return url.to_string();
    }
    match (base_url.ends_with('/'), url.starts_with('/')) {
        (true, true) => format!("{base_url}{}", &url[1..]),
        (false, false) => format!("{base_url}/{url}"),
        _ => format!("{base_url}{url}"),
    }
}

/// `key=value` pairs joined with `&`, both sides URL-component encoded.
/// Empty data gives an empty string.
pub fn to_query_string(data: &RequestData) -> Result<String, RequestError> {
    let mut pairs = Vec::with_capacity(data.len());
    for (key, value) in data {
        let value = scalar_to_string(key, value)?;
        pairs.push(format!(
            "{}={}",
            utf8_percent_encode(key, URI_COMPONENT),
            utf8_percent_encode(&value, URI_COMPONENT)
        ));
    }
    Ok(pairs.join("&"))
}

/// Appends `query` with `?`, or `&` if the URL already has a query.
pub fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

/// Body for POST/PUT, selected by the exact `Content-Type` value.
pub fn encode_body(
    data: &RequestData,
    content_type: Option<&str>,
) -> Result<Option<Body>, RequestError> {
    match content_type {
        Some(FORM_URLENCODED) => {
            let form = to_query_string(data)?;
            Ok((!form.is_empty()).then_some(Body::Text(form)))
        }
        Some(APPLICATION_JSON) => serde_json::to_string(data)
            .map(|json| Some(Body::Text(json)))
            .map_err(|e| RequestError::Construction(e.to_string())),
        _ => Ok((!data.is_empty()).then(|| Body::Fields(data.clone()))),
    }
}

fn scalar_to_string(key: &str, value: &Value) -> Result<String, RequestError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Array(_) | Value::Object(_) => Err(RequestError::Construction(format!(
            "field `{key}` is {} and cannot be URL-encoded",
            json_kind(value)
        ))),
    }
}
