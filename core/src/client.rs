//! Convenience client that stamps shared settings onto request configs.
//!
//! # Design
//! `HttpClient` holds only its `ClientSettings` and carries no mutable state
//! between calls. Each method returns a `RequestConfig` the caller can refine
//! further and then hand to `Request::with_callbacks` or `Request::future`
//! together with a transport.

use crate::config::{ClientSettings, RequestConfig};
use crate::http::HttpMethod;

#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    settings: ClientSettings,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            settings: ClientSettings {
                base_url: base_url.to_string(),
                ..ClientSettings::default()
            },
        }
    }

    pub fn from_settings(settings: ClientSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// A config for `method url` carrying the client's base URL, timeout and
    /// default headers.
    pub fn request(&self, method: HttpMethod, url: &str) -> RequestConfig {
        RequestConfig::new(url)
            .method(method)
            .base_url(self.settings.base_url.clone())
            .timeout(self.settings.timeout())
            .headers(self.settings.default_headers.iter().cloned())
    }

    pub fn get(&self, url: &str) -> RequestConfig {
        self.request(HttpMethod::Get, url)
    }

    pub fn post(&self, url: &str) -> RequestConfig {
        self.request(HttpMethod::Post, url)
    }

    pub fn put(&self, url: &str) -> RequestConfig {
        self.request(HttpMethod::Put, url)
    }

    pub fn delete(&self, url: &str) -> RequestConfig {
        self.request(HttpMethod::Delete, url)
    }
}
