//! Blocking execution on top of the callback engine.
//!
//! # Design
//! The calling thread waits on a single-slot `Condvar` that the engine's
//! completion fills. The slot is closed by the waiter when it stops waiting,
//! whether it got an outcome or gave up at the deadline. Filling and closing
//! happen under the same lock, so a completion racing the deadline is either
//! seen by the waiter or discarded; it is never stored after the waiter has
//! returned.
//!
//! On timeout the in-flight call is cancelled (best-effort) and the caller
//! gets `ApiError::Timeout`.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::config::millis;
use crate::engine;
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

/// Timeout applied when a call site does not pass one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Default)]
struct SlotState {
    outcome: Option<Result<HttpResponse>>,
    closed: bool,
}

#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl Slot {
    fn fill(&self, outcome: Result<HttpResponse>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed || state.outcome.is_some() {
            tracing::trace!("discarding completion that arrived after the caller stopped waiting");
            return;
        }
        state.outcome = Some(outcome);
        drop(state);
        self.ready.notify_one();
    }

    /// Wait up to `timeout` for an outcome, then close the slot.
    fn wait(&self, timeout: Duration) -> Option<Result<HttpResponse>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut state, _) = self
            .ready
            .wait_timeout_while(state, timeout, |s| s.outcome.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        state.outcome.take()
    }
}

/// Execute `request` and block until it completes or `timeout` elapses.
pub fn execute_blocking(
    transport: &dyn Transport,
    request: HttpRequest,
    timeout: Duration,
) -> Result<HttpResponse> {
    let slot = Arc::new(Slot::default());
    let sink = Arc::clone(&slot);
    let method = request.method.clone();
    let url = request.url.clone();

    let handle = engine::execute(transport, request, move |outcome| sink.fill(outcome));

    match slot.wait(timeout) {
        Some(outcome) => outcome,
        None => {
            handle.cancel();
            tracing::warn!(%method, %url, timeout_ms = millis(timeout), "request timed out; cancelled");
            Err(ApiError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CallState;
    use crate::http::{HeaderSet, HttpMethod};
    use crate::testing::StubTransport;
    use crate::transport::TransportReply;
    use std::io;
    use std::sync::mpsc;
    use std::time::Instant;

    fn get() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: "http://h/x".to_string(),
            headers: HeaderSet::new(),
            body: None,
            content_type: None,
        }
    }

    #[test]
    fn returns_the_completed_response() {
        let transport = StubTransport::replying([TransportReply::response(
            200,
            HeaderSet::new(),
            b"{\"a\":1}".to_vec(),
        )]);
        let response = execute_blocking(&transport, get(), Duration::from_secs(1)).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"{\"a\":1}");
    }

    #[test]
    fn surfaces_transport_errors() {
        let transport = StubTransport::replying([TransportReply::failed(Box::new(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))]);
        let err = execute_blocking(&transport, get(), Duration::from_secs(1)).unwrap_err();
        match err {
            ApiError::Transport(source) => {
                let io_err = source.downcast_ref::<io::Error>().unwrap();
                assert_eq!(io_err.kind(), io::ErrorKind::ConnectionRefused);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn times_out_when_transport_never_answers() {
        let transport = StubTransport::holding();
        let timeout = Duration::from_millis(100);
        let started = Instant::now();
        let err = execute_blocking(&transport, get(), timeout).unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, ApiError::Timeout));
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_secs(1), "blocked for {elapsed:?}");
        assert_eq!(transport.cancellations(), 1);
    }

    #[test]
    fn late_completion_after_timeout_is_discarded() {
        let transport = StubTransport::holding();
        let err = execute_blocking(&transport, get(), Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, ApiError::Timeout));

        // The transport ignores the cancel and answers anyway.
        transport.release(TransportReply::response(200, HeaderSet::new(), b"{}".to_vec()));
        assert_eq!(transport.cancellations(), 1);
    }

    #[test]
    fn late_completion_never_reaches_the_waiter() {
        let transport = StubTransport::holding();
        let slot = Arc::new(Slot::default());
        let sink = Arc::clone(&slot);
        let (tx, rx) = mpsc::channel();
        let handle = engine::execute(&transport, get(), move |outcome| {
            tx.send(()).unwrap();
            sink.fill(outcome);
        });

        assert!(slot.wait(Duration::from_millis(20)).is_none());
        handle.cancel();
        transport.release(TransportReply::response(200, HeaderSet::new(), b"{}".to_vec()));

        assert_eq!(rx.recv_timeout(Duration::from_millis(100)), Err(mpsc::RecvTimeoutError::Disconnected));
        let state = slot.state.lock().unwrap();
        assert!(state.closed);
        assert!(state.outcome.is_none());
    }

    #[test]
    fn slot_rejects_fill_after_close() {
        let slot = Slot::default();
        assert!(slot.wait(Duration::from_millis(1)).is_none());
        slot.fill(Err(ApiError::NoData));
        let state = slot.state.lock().unwrap();
        assert!(state.closed);
        assert!(state.outcome.is_none());
    }

    #[test]
    fn slot_keeps_only_the_first_outcome() {
        let slot = Slot::default();
        slot.fill(Err(ApiError::NoData));
        slot.fill(Err(ApiError::NoHttpResponse));
        let outcome = slot.wait(Duration::from_millis(1)).unwrap();
        assert!(matches!(outcome, Err(ApiError::NoData)));
    }

    #[test]
    fn timed_out_call_is_left_cancelled() {
        let transport = StubTransport::holding();
        let slot = Arc::new(Slot::default());
        let sink = Arc::clone(&slot);
        let handle = engine::execute(&transport, get(), move |outcome| sink.fill(outcome));
        assert!(slot.wait(Duration::from_millis(10)).is_none());
        assert!(handle.cancel());
        assert_eq!(handle.state(), CallState::Cancelled);
    }
}
