//! Response resolution: raw transport output to a typed outcome.

use crate::error::RequestError;
use crate::http::{ResponseBody, TransportResponse, APPLICATION_JSON, CONTENT_TYPE};

/// Parses the body as JSON when the `Content-Type` header contains
/// `application/json`, otherwise returns the raw text.
///
/// A body that claims to be JSON but does not parse is an error, never a
/// silent fallback to text.
pub fn resolve_response(response: TransportResponse) -> Result<ResponseBody, RequestError> {
    let declares_json = response
        .header(CONTENT_TYPE)
        .is_some_and(|value| value.contains(APPLICATION_JSON));
    if !declares_json {
        return Ok(ResponseBody::Text(response.text));
    }
    serde_json::from_str(&response.text)
        .map(ResponseBody::Json)
        .map_err(|e| RequestError::InvalidJson(e.to_string()))
}
