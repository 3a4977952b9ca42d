//! Exactly-once settlement shared by a request and its transport.
//!
//! # Design
//! The executor always produces one `Outcome`. How it reaches the caller is
//! decided by the attached `Completion`: a callback pair or a oneshot channel
//! behind a future. The completion sits in an `Option` that is taken under a
//! lock, so whichever event settles first wins and every later attempt is a
//! logged no-op. Progress handlers are dropped at settlement, which is what
//! keeps them from ever running afterwards.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::channel::oneshot;

use crate::config::ProgressHandler;
use crate::error::RequestError;
use crate::http::ResponseBody;

/// The single result every request produces.
pub type Outcome = Result<ResponseBody, RequestError>;

/// Lifecycle of one request. `Succeeded` and `Failed` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Built,
    Sent,
    Succeeded,
    Failed,
}

impl RequestState {
    pub fn is_settled(&self) -> bool {
        matches!(self, RequestState::Succeeded | RequestState::Failed)
    }
}

/// Delivers an outcome to whoever is waiting for it. Called at most once.
pub trait Completion: Send {
    fn complete(self: Box<Self>, outcome: Outcome);
}

/// Callback-style completion: exactly one of the two functions runs.
pub struct Callbacks<S, E> {
    on_success: S,
    on_error: E,
}

impl<S, E> Callbacks<S, E>
where
    S: FnOnce(ResponseBody) + Send + 'static,
    E: FnOnce(RequestError) + Send + 'static,
{
    pub fn new(on_success: S, on_error: E) -> Self {
        Self {
            on_success,
            on_error,
        }
    }
}

impl<S, E> Completion for Callbacks<S, E>
where
    S: FnOnce(ResponseBody) + Send + 'static,
    E: FnOnce(RequestError) + Send + 'static,
{
    fn complete(self: Box<Self>, outcome: Outcome) {
        match outcome {
            Ok(body) => (self.on_success)(body),
            Err(err) => (self.on_error)(err),
        }
    }
}

/// Future-style completion backed by a oneshot channel.
pub(crate) struct Deferred(oneshot::Sender<Outcome>);

impl Deferred {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        (Self(tx), rx)
    }
}

impl Completion for Deferred {
    fn complete(self: Box<Self>, outcome: Outcome) {
        // A dropped receiver means nobody is waiting any more.
        let _ = self.0.send(outcome);
    }
}

struct Inner {
    state: RequestState,
    completion: Option<Box<dyn Completion>>,
    on_progress: Option<ProgressHandler>,
}

pub(crate) struct Settlement {
    label: String,
    inner: Mutex<Inner>,
}

impl Settlement {
    pub(crate) fn new(
        label: String,
        completion: Box<dyn Completion>,
        on_progress: Option<ProgressHandler>,
    ) -> Arc<Self> {
        Arc::new(Self {
            label,
            inner: Mutex::new(Inner {
                state: RequestState::Built,
                completion: Some(completion),
                on_progress,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn state(&self) -> RequestState {
        self.lock().state
    }

    pub(crate) fn mark_sent(&self) {
        let mut inner = self.lock();
        if inner.state == RequestState::Built {
            inner.state = RequestState::Sent;
        }
    }

    /// Runs the progress handler unless the request already settled. The
    /// handler runs without the lock held, so it may inspect or settle its
    /// own request. It is only put back if the request is still pending.
    pub(crate) fn progress(&self, fraction: f64) {
        let handler = {
            let mut inner = self.lock();
            if inner.state.is_settled() {
                log::warn!("{}: progress event after settlement ignored", self.label);
                return;
            }
            inner.on_progress.take()
        };
        let Some(mut handler) = handler else {
            return;
        };
        handler(fraction);

        let mut inner = self.lock();
        if !inner.state.is_settled() && inner.on_progress.is_none() {
            inner.on_progress = Some(handler);
        }
    }

    /// Delivers `outcome` if nothing has settled yet. Returns whether this
    /// call was the one that settled the request.
    pub(crate) fn settle(&self, outcome: Outcome) -> bool {
        self.settle_inner(outcome, true)
    }

    /// Like `settle`, but a request that already settled is left alone
    /// without a warning. Used for the fallback outcome of a dropped sink.
    pub(crate) fn abandon(&self, outcome: Outcome) -> bool {
        self.settle_inner(outcome, false)
    }

    fn settle_inner(&self, outcome: Outcome, warn_if_settled: bool) -> bool {
        let completion = {
            let mut inner = self.lock();
            let Some(completion) = inner.completion.take() else {
                if warn_if_settled {
                    log::warn!("{}: request already settled, dropping {outcome:?}", self.label);
                }
                return false;
            };
            inner.state = if outcome.is_ok() {
                RequestState::Succeeded
            } else {
                RequestState::Failed
            };
            inner.on_progress = None;
            completion
        };

        match &outcome {
            Ok(_) => log::info!("{}: succeeded", self.label),
            Err(err) => log::error!("{}: {err}", self.label),
        }
        completion.complete(outcome);
        true
    }
}
