//! The request executor and its two completion styles.
//!
//! # Design
//! Constructing a `Request` builds it and sends it; there is no separate
//! `send`. `with_callbacks` hands the outcome to a success/error pair,
//! `future` hands it to a `ResponseFuture`. Both go through the same
//! `Settlement`, so the outcome logic does not know which style is attached.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::FutureExt;

use crate::builder::RequestBuilder;
use crate::config::RequestConfig;
use crate::error::RequestError;
use crate::http::{HttpMethod, ResolvedRequest, ResponseBody};
use crate::settlement::{Callbacks, Completion, Deferred, Outcome, RequestState, Settlement};
use crate::transport::{ResponseSink, Transport};

/// One in-flight request that owns its transport.
pub struct Request<T> {
    transport: T,
    resolved: Option<ResolvedRequest>,
    settlement: Arc<Settlement>,
}

impl<T: Transport> Request<T> {
    /// Builds and sends the request. Exactly one of the callbacks runs, from
    /// whichever context the transport reports on; a construction error
    /// calls `on_error` before this returns.
    pub fn with_callbacks<S, E>(config: RequestConfig, transport: T, on_success: S, on_error: E) -> Self
    where
        S: FnOnce(ResponseBody) + Send + 'static,
        E: FnOnce(RequestError) + Send + 'static,
    {
        Self::start(config, transport, Box::new(Callbacks::new(on_success, on_error)))
    }

    /// Builds and sends the request, returning a future of its outcome.
    pub fn future(config: RequestConfig, transport: T) -> ResponseFuture<T> {
        let (deferred, receiver) = Deferred::channel();
        let request = Self::start(config, transport, Box::new(deferred));
        ResponseFuture { request, receiver }
    }

    fn start(mut config: RequestConfig, transport: T, completion: Box<dyn Completion>) -> Self {
        let on_progress = config.on_progress.take();
        match RequestBuilder::build(&config) {
            Ok(resolved) => {
                let label = format!("({}) {}", resolved.method, resolved.url);
                let settlement = Settlement::new(label, completion, on_progress);
                let mut request = Self {
                    transport,
                    resolved: Some(resolved),
                    settlement,
                };
                request.dispatch();
                request
            }
            Err(err) => {
                let label = format!("({}) {}", config.method, config.url);
                let settlement = Settlement::new(label, completion, None);
                settlement.settle(Err(err));
                Self {
                    transport,
                    resolved: None,
                    settlement,
                }
            }
        }
    }

    fn dispatch(&mut self) {
        let Some(resolved) = &self.resolved else {
            return;
        };
        self.transport
            .open(resolved.method, &resolved.url, resolved.timeout);
        for (name, value) in &resolved.headers {
            self.transport.set_header(name, value);
        }

        log::info!("({}) {}", resolved.method, resolved.url);
        if let Some(body) = &resolved.body {
            log::debug!("({}) {} body: {body:?}", resolved.method, resolved.url);
        }

        let body = match resolved.method {
            HttpMethod::Get => None,
            _ => resolved.body.clone(),
        };
        self.settlement.mark_sent();
        self.transport
            .send(body, ResponseSink::new(self.settlement.clone()));
    }

    /// Settles the request as `Cancelled` if it is still pending and asks the
    /// transport to stop. Later transport events are ignored.
    pub fn abort(&mut self) {
        if self.settlement.settle(Err(RequestError::Cancelled)) {
            self.transport.abort();
        }
    }

    pub fn state(&self) -> RequestState {
        self.settlement.state()
    }

    /// The finalized request, absent when construction failed.
    pub fn resolved(&self) -> Option<&ResolvedRequest> {
        self.resolved.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// Resolves once with the request's outcome.
pub struct ResponseFuture<T> {
    request: Request<T>,
    receiver: oneshot::Receiver<Outcome>,
}

// The transport is never pinned; only the receiver is polled.
impl<T> Unpin for ResponseFuture<T> {}

impl<T: Transport> ResponseFuture<T> {
    pub fn abort(&mut self) {
        self.request.abort();
    }

    pub fn state(&self) -> RequestState {
        self.request.state()
    }

    pub fn resolved(&self) -> Option<&ResolvedRequest> {
        self.request.resolved()
    }

    pub fn transport(&self) -> &T {
        self.request.transport()
    }
}

impl<T> Future for ResponseFuture<T> {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut().receiver.poll_unpin(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // The sender only disappears unsent if the settlement itself was
            // dropped, which means the request can no longer complete.
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(RequestError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}
