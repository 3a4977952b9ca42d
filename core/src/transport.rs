//! The transport seam: whatever actually performs the network I/O.
//!
//! # Design
//! A transport is opened, configured with headers, and sent exactly once.
//! It reports back through a `ResponseSink`. `load` and `error` consume the
//! sink, so a transport cannot emit a second terminal event or a progress
//! event after one. A sink dropped without a terminal event settles the
//! request as a transport error, so no request is ever left pending.

use std::sync::Arc;
use std::time::Duration;

use crate::error::RequestError;
use crate::http::{Body, ErrorPayload, HttpMethod, TransportResponse};
use crate::response::resolve_response;
use crate::settlement::Settlement;

pub const ABANDONED_MESSAGE: &str = "transport closed without a response";

/// Platform HTTP client executing a single request.
///
/// Calls arrive in a fixed order: `open`, then `set_header` once per header,
/// then `send`. `abort` may follow `send`.
pub trait Transport {
    fn open(&mut self, method: HttpMethod, url: &str, timeout: Duration);

    fn set_header(&mut self, name: &str, value: &str);

    /// Starts the exchange. Must not block on the network; results go to
    /// `sink`, from this thread or any other.
    fn send(&mut self, body: Option<Body>, sink: ResponseSink);

    /// Best-effort cancellation. The request is already settled as
    /// cancelled when this runs.
    fn abort(&mut self) {}
}

/// Event channel from a transport back to its request.
pub struct ResponseSink {
    settlement: Arc<Settlement>,
    finished: bool,
}

impl ResponseSink {
    pub(crate) fn new(settlement: Arc<Settlement>) -> Self {
        Self {
            settlement,
            finished: false,
        }
    }

    /// Upload progress as a fraction in `[0, 1]`.
    pub fn progress(&self, fraction: f64) {
        self.settlement.progress(fraction);
    }

    /// True once the request settled, e.g. because its owner aborted it.
    pub fn is_settled(&self) -> bool {
        self.settlement.state().is_settled()
    }

    pub fn load(mut self, response: TransportResponse) {
        self.finished = true;
        log::debug!(
            "{}: response {} ({} bytes)",
            self.settlement.label(),
            response.status,
            response.text.len()
        );
        self.settlement.settle(resolve_response(response));
    }

    pub fn error(mut self, payload: ErrorPayload) {
        self.finished = true;
        self.settlement.settle(Err(RequestError::Transport(payload)));
    }
}

impl Drop for ResponseSink {
    fn drop(&mut self) {
        if !self.finished {
            self.settlement.abandon(Err(RequestError::Transport(ErrorPayload::Text(
                ABANDONED_MESSAGE.to_string(),
            ))));
        }
    }
}
