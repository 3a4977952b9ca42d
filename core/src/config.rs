//! Request configuration and client-wide settings.
//!
//! # Design
//! `RequestConfig` is the single input to a request. It holds no global
//! state: the base URL is an explicit field, and `ClientSettings` is a plain
//! value the caller loads (from JSON, the environment, or code) and stamps
//! onto configs through `HttpClient`.
//!
//! Data is accepted from any `Serialize` value. A value that fails to
//! serialize is remembered rather than panicking, and the builder reports it
//! as a construction error through the request's error channel.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::{Headers, HttpMethod, RequestData};

pub const DEFAULT_BASE_URL: &str = "http://";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

pub const ENV_BASE_URL: &str = "HTTP_REQUEST_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "HTTP_REQUEST_TIMEOUT_MS";

/// Invoked with the upload progress fraction in `[0, 1]`.
pub type ProgressHandler = Box<dyn FnMut(f64) + Send>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DataSlot {
    Ready(RequestData),
    Invalid(String),
}

/// Everything needed to issue one request.
pub struct RequestConfig {
    pub(crate) url: String,
    pub(crate) base_url: String,
    pub(crate) method: HttpMethod,
    pub(crate) headers: Headers,
    pub(crate) data: DataSlot,
    pub(crate) timeout: Duration,
    pub(crate) on_progress: Option<ProgressHandler>,
}

impl RequestConfig {
    /// A `GET` to `url` with the default base URL, no headers, empty data and
    /// a 10 second timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            method: HttpMethod::Get,
            headers: Vec::new(),
            data: DataSlot::Ready(RequestData::new()),
            timeout: DEFAULT_TIMEOUT,
            on_progress: None,
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Used only when the URL is not already absolute. Must carry an
    /// `http` or `https` scheme, or building fails.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Appends a header. Headers are applied in the order they were added.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Replaces the request data with the serialized form of `data`, which
    /// must serialize to a JSON object (or null, meaning no data).
    pub fn data<T: Serialize + ?Sized>(mut self, data: &T) -> Self {
        self.data = match serde_json::to_value(data) {
            Ok(Value::Object(map)) => DataSlot::Ready(map),
            Ok(Value::Null) => DataSlot::Ready(RequestData::new()),
            Ok(other) => DataSlot::Invalid(format!(
                "request data must be an object, got {}",
                json_kind(&other)
            )),
            Err(e) => DataSlot::Invalid(e.to_string()),
        };
        self
    }

    /// Sets a single data field, keeping insertion order. Ignored if the data
    /// already failed to serialize.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let DataSlot::Ready(map) = &mut self.data {
            map.insert(key.into(), value.into());
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn on_progress<F>(mut self, handler: F) -> Self
    where
        F: FnMut(f64) + Send + 'static,
    {
        self.on_progress = Some(Box::new(handler));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("base_url", &self.base_url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("data", &self.data)
            .field("timeout", &self.timeout)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Settings shared by every request an `HttpClient` creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Applied before per-request headers, in this order.
    pub default_headers: Vec<(String, String)>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            default_headers: Vec::new(),
        }
    }
}

impl ClientSettings {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Defaults overridden by `HTTP_REQUEST_BASE_URL` and
    /// `HTTP_REQUEST_TIMEOUT_MS` when they are set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            settings.base_url = base_url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => settings.timeout_ms = ms,
                _ => log::warn!("ignoring invalid {ENV_TIMEOUT_MS}={raw:?}"),
            }
        }
        settings
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_documented_values() {
        let config = RequestConfig::new("/users");
        assert_eq!(config.base_url, "http://");
        assert_eq!(config.method, HttpMethod::Get);
        assert_eq!(config.timeout, Duration::from_millis(10_000));
        assert!(config.headers.is_empty());
        assert_eq!(config.data, DataSlot::Ready(RequestData::new()));
    }

    #[test]
    fn data_keeps_insertion_order() {
        let config = RequestConfig::new("/x").field("z", 1).field("a", 2).field("m", 3);
        let DataSlot::Ready(map) = config.data else {
            panic!("data should be ready");
        };
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn non_object_data_is_remembered_as_invalid() {
        let config = RequestConfig::new("/x").data(&json!([1, 2, 3]));
        assert!(matches!(config.data, DataSlot::Invalid(ref msg) if msg.contains("an array")));
    }

    #[test]
    fn unserializable_data_is_remembered_as_invalid() {
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys are not valid JSON object keys");
        let config = RequestConfig::new("/x").data(&map);
        assert!(matches!(config.data, DataSlot::Invalid(_)));
    }

    #[test]
    fn null_data_means_no_data() {
        let config = RequestConfig::new("/x").data(&Value::Null);
        assert_eq!(config.data, DataSlot::Ready(RequestData::new()));
    }

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings = ClientSettings::from_json(r#"{"base_url":"http://api.test"}"#).unwrap();
        assert_eq!(settings.base_url, "http://api.test");
        assert_eq!(settings.timeout_ms, 10_000);
        assert!(settings.default_headers.is_empty());
    }

    #[test]
    fn settings_read_from_lookup() {
        let settings = ClientSettings::from_lookup(|key| match key {
            ENV_BASE_URL => Some("https://env.test".to_string()),
            ENV_TIMEOUT_MS => Some("2500".to_string()),
            _ => None,
        });
        assert_eq!(settings.base_url, "https://env.test");
        assert_eq!(settings.timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn invalid_timeout_in_lookup_keeps_default() {
        let settings = ClientSettings::from_lookup(|key| match key {
            ENV_TIMEOUT_MS => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(settings.timeout_ms, 10_000);
    }
}
