//! Callback-driven request execution.
//!
//! # Design
//! `execute` submits exactly one request to the transport and turns the
//! transport's raw reply into a single `Result<HttpResponse>`:
//!
//! - an error from the transport wins over anything else it reported,
//! - a reply without a response head is `NoHttpResponse`,
//! - a response without a body is `NoData`.
//!
//! Every call carries a small state machine (`Pending -> Completed` or
//! `Pending -> Cancelled`). The transition is a single compare-and-swap, so
//! exactly one terminal state is ever reached and the completion runs at most
//! once. A reply arriving after `cancel` finds the call already settled and
//! is dropped.
//!
//! No retries happen here.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse, KeyedResponse};
use crate::transport::{InFlight, Transport, TransportReply};

/// Lifecycle of a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Pending,
    Completed,
    Cancelled,
}

const PENDING: u8 = 0;
const COMPLETED: u8 = 1;
const CANCELLED: u8 = 2;

#[derive(Debug)]
struct CallCell(AtomicU8);

impl CallCell {
    fn new(state: u8) -> Self {
        Self(AtomicU8::new(state))
    }

    /// Move out of `Pending`. Returns false if the call was already settled.
    fn settle(&self, to: u8) -> bool {
        self.0
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn get(&self) -> CallState {
        match self.0.load(Ordering::Acquire) {
            PENDING => CallState::Pending,
            COMPLETED => CallState::Completed,
            _ => CallState::Cancelled,
        }
    }
}

/// Handle to a call started by `execute`.
pub struct RequestHandle {
    state: Arc<CallCell>,
    inflight: Option<Box<dyn InFlight>>,
}

impl RequestHandle {
    /// A call that finished before reaching the transport.
    pub(crate) fn finished() -> Self {
        Self {
            state: Arc::new(CallCell::new(COMPLETED)),
            inflight: None,
        }
    }

    /// Cancel the call if it is still pending.
    ///
    /// Returns true if this call moved it to `Cancelled`; the completion will
    /// then never run. Returns false if it had already completed or been
    /// cancelled.
    pub fn cancel(&self) -> bool {
        if !self.state.settle(CANCELLED) {
            return false;
        }
        if let Some(inflight) = &self.inflight {
            inflight.cancel();
        }
        true
    }

    pub fn state(&self) -> CallState {
        self.state.get()
    }
}

impl std::fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandle")
            .field("state", &self.state())
            .finish()
    }
}

/// Submit `request` and deliver its outcome to `completion`, at most once.
pub fn execute<F>(transport: &dyn Transport, request: HttpRequest, completion: F) -> RequestHandle
where
    F: FnOnce(Result<HttpResponse>) + Send + 'static,
{
    let state = Arc::new(CallCell::new(PENDING));
    let cell = Arc::clone(&state);
    let method = request.method.clone();
    let url = request.url.clone();
    tracing::debug!(%method, %url, "issuing request");

    let inflight = transport.submit(
        request,
        Box::new(move |reply| {
            if !cell.settle(COMPLETED) {
                tracing::trace!(%method, %url, "discarding reply to cancelled request");
                return;
            }
            let outcome = normalize(reply);
            match &outcome {
                Ok(response) => tracing::debug!(%method, %url, status = response.status, "request completed"),
                Err(err) => tracing::debug!(%method, %url, error = %err, "request failed"),
            }
            completion(outcome);
        }),
    );

    RequestHandle {
        state,
        inflight: Some(inflight),
    }
}

/// Like `execute`, additionally decoding the body as a JSON object.
pub fn execute_keyed<F>(transport: &dyn Transport, request: HttpRequest, completion: F) -> RequestHandle
where
    F: FnOnce(Result<KeyedResponse>) + Send + 'static,
{
    execute(transport, request, move |outcome| {
        completion(outcome.and_then(HttpResponse::into_keyed))
    })
}

fn normalize(reply: TransportReply) -> Result<HttpResponse> {
    let TransportReply { body, head, error } = reply;
    if let Some(err) = error {
        return Err(ApiError::Transport(err));
    }
    let head = head.ok_or(ApiError::NoHttpResponse)?;
    let body = body.ok_or(ApiError::NoData)?;
    Ok(HttpResponse {
        status: head.status,
        headers: head.headers,
        body,
    })
}
