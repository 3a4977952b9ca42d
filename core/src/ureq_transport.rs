//! Blocking `ureq` agent driven from a worker thread.
//!
//! # Design
//! `send` returns immediately and the exchange runs on its own thread, which
//! reports back through the `ResponseSink`. Failure statuses (400 and up) are
//! reported as error events carrying `{"code": status, "body": text}`, the
//! way platform HTTP clients route them to their error handler. Network
//! failures become text payloads.
//!
//! Pass-through fields are encoded by the declared `Content-Type`: a url
//! encoded form when none is set, a multipart body for
//! `multipart/form-data`. Any other declared type is refused before the
//! request goes out, since the fields cannot be labelled honestly.

use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use ureq::typestate::WithBody;
use ureq::{Agent, RequestBuilder};

use crate::http::{
    find_header, Body, ErrorPayload, Headers, HttpMethod, RequestData, TransportResponse,
    CONTENT_TYPE,
};
use crate::transport::{ResponseSink, Transport};

const MULTIPART_FORM_DATA: &str = "multipart/form-data";

struct Target {
    method: HttpMethod,
    url: String,
    timeout: Duration,
}

/// One-shot transport backed by a fresh `ureq::Agent`.
#[derive(Default)]
pub struct UreqTransport {
    target: Option<Target>,
    headers: Headers,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for UreqTransport {
    fn open(&mut self, method: HttpMethod, url: &str, timeout: Duration) {
        self.target = Some(Target {
            method,
            url: url.to_string(),
            timeout,
        });
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn send(&mut self, body: Option<Body>, sink: ResponseSink) {
        let Some(target) = self.target.take() else {
            sink.error(ErrorPayload::Text("send called before open".to_string()));
            return;
        };
        let headers = std::mem::take(&mut self.headers);
        let spawned = thread::Builder::new()
            .name("ureq-transport".to_string())
            .spawn(move || exchange(target, headers, body, sink));
        if let Err(e) = spawned {
            // The closure, and the sink with it, is dropped here, which
            // settles the request as a transport error.
            log::error!("failed to spawn transport thread: {e}");
        }
    }

    fn abort(&mut self) {
        // The exchange may still finish on its thread; the sink ignores it.
        log::debug!("ureq transport aborted");
    }
}

fn exchange(target: Target, mut headers: Headers, body: Option<Body>, sink: ResponseSink) {
    let uploads = body.is_some();
    let payload = match prepare_payload(&mut headers, body) {
        Ok(payload) => payload,
        Err(message) => {
            sink.error(ErrorPayload::Text(message));
            return;
        }
    };

    let agent: Agent = Agent::config_builder()
        .timeout_global(Some(target.timeout))
        .http_status_as_error(false)
        .build()
        .new_agent();

    let url = target.url.as_str();
    let result = match target.method {
        HttpMethod::Get => with_headers(agent.get(url), &headers).call(),
        HttpMethod::Delete => with_headers(agent.delete(url), &headers).call(),
        HttpMethod::Post => send_body(with_headers(agent.post(url), &headers), payload),
        HttpMethod::Put => send_body(with_headers(agent.put(url), &headers), payload),
    };

    if sink.is_settled() {
        return;
    }

    let mut response = match result {
        Ok(response) => response,
        Err(e) => {
            sink.error(ErrorPayload::Text(e.to_string()));
            return;
        }
    };
    if uploads {
        sink.progress(1.0);
    }

    let status = response.status().as_u16();
    let response_headers: Headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let text = match response.body_mut().read_to_string() {
        Ok(text) => text,
        Err(e) => {
            sink.error(ErrorPayload::Text(e.to_string()));
            return;
        }
    };

    if status >= 400 {
        sink.error(ErrorPayload::Structured(json!({ "code": status, "body": text })));
        return;
    }
    sink.load(TransportResponse {
        status,
        headers: response_headers,
        text,
    });
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &Headers) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// What actually goes on the wire for a POST or PUT.
#[derive(Debug, PartialEq)]
enum Payload {
    Empty,
    Bytes(Vec<u8>),
    Form(Vec<(String, String)>),
}

/// Chooses the wire encoding for `body`. A multipart body rewrites the
/// caller's `Content-Type` so it carries the boundary.
fn prepare_payload(headers: &mut Headers, body: Option<Body>) -> Result<Payload, String> {
    let fields = match body {
        None => return Ok(Payload::Empty),
        Some(Body::Text(text)) => return Ok(Payload::Bytes(text.into_bytes())),
        Some(Body::Fields(fields)) => fields,
    };

    let Some(content_type) = find_header(headers, CONTENT_TYPE) else {
        return Ok(Payload::Form(form_pairs(&fields)));
    };
    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    if !media_type.eq_ignore_ascii_case(MULTIPART_FORM_DATA) {
        return Err(format!("unsupported pass-through content type: {content_type}"));
    }

    let boundary = uuid::Uuid::new_v4().simple().to_string();
    for (name, value) in headers.iter_mut() {
        if name.eq_ignore_ascii_case(CONTENT_TYPE) {
            *value = format!("{MULTIPART_FORM_DATA}; boundary={boundary}");
        }
    }
    Ok(Payload::Bytes(multipart_body(&fields, &boundary)))
}

fn send_body(
    builder: RequestBuilder<WithBody>,
    payload: Payload,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match payload {
        Payload::Empty => builder.send_empty(),
        Payload::Bytes(bytes) => builder.send(&bytes[..]),
        Payload::Form(pairs) => builder.send_form(pairs),
    }
}

/// `multipart/form-data` body with one text part per field.
fn multipart_body(fields: &RequestData, boundary: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    for (name, value) in form_pairs(fields) {
        let name = name
            .replace('"', "%22")
            .replace('\r', "%0D")
            .replace('\n', "%0A");
        buf.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        buf.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    buf
}

/// Field values as text; nested values as their JSON text.
fn form_pairs(fields: &RequestData) -> Vec<(String, String)> {
    fields
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}
