//! Single-request HTTP client core.
//!
//! # Overview
//! A `RequestConfig` is resolved into a `ResolvedRequest` (absolute URL,
//! query or body encoding chosen by method and content type), sent once over
//! a caller-supplied `Transport`, and settled exactly once with a parsed
//! response or a `RequestError`.
//!
//! # Design
//! - `RequestBuilder` is pure: no I/O, fully deterministic.
//! - The transport is a trait; the network lives outside the core
//!   (host-does-IO). `UreqTransport` is bundled behind `ureq-transport`.
//! - Completion is either a callback pair (`Request::with_callbacks`) or a
//!   future (`Request::future`); both share one settlement path.
//! - Nothing is retried, pooled or cached. One instance, one request.

pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod request;
pub mod response;
pub mod settlement;
pub mod transport;
#[cfg(feature = "ureq-transport")]
pub mod ureq_transport;

pub use builder::RequestBuilder;
pub use client::HttpClient;
pub use config::{ClientSettings, RequestConfig};
pub use error::RequestError;
pub use http::{Body, ErrorPayload, HttpMethod, ResolvedRequest, ResponseBody, TransportResponse};
pub use request::{Request, ResponseFuture};
pub use response::resolve_response;
pub use settlement::{Outcome, RequestState};
pub use transport::{ResponseSink, Transport};
#[cfg(feature = "ureq-transport")]
pub use ureq_transport::UreqTransport;
