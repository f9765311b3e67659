//! The network collaborator and its `ureq` implementation.
//!
//! # Design
//! A `Transport` accepts a fully built `HttpRequest` plus a one-shot callback
//! and returns an `InFlight` handle. The callback receives the raw triple the
//! transport produced (body, response head, error), any of which may be
//! missing; the request engine decides what that triple means. Transports
//! must invoke the callback at most once and may do so from any thread.
//!
//! Cancellation is best-effort. A transport may still invoke the callback
//! after `cancel`, and the engine discards such late replies.
//!
//! `UreqTransport` cannot interrupt a blocked worker, so every request it
//! runs is bounded by the agent's global timeout. A worker left behind by a
//! cancelled or timed-out call ends once that bound passes. Response bodies
//! are read in full with no size cap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::error::TransportError;
use crate::http::{HeaderSet, HttpRequest, ResponseHead};

/// What a transport hands back for one request.
#[derive(Debug, Default)]
pub struct TransportReply {
    pub body: Option<Vec<u8>>,
    pub head: Option<ResponseHead>,
    pub error: Option<TransportError>,
}

impl TransportReply {
    /// A complete response.
    pub fn response(status: u16, headers: HeaderSet, body: Vec<u8>) -> Self {
        Self {
            body: Some(body),
            head: Some(ResponseHead { status, headers }),
            error: None,
        }
    }

    pub fn failed(error: TransportError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Callback a transport invokes with the outcome of a submitted request.
pub type ReplyCallback = Box<dyn FnOnce(TransportReply) + Send + 'static>;

/// A submitted request that has not necessarily finished.
pub trait InFlight: Send + Sync {
    /// Ask the transport to abandon the request.
    fn cancel(&self);
}

/// Performs network I/O on behalf of the client.
pub trait Transport: Send + Sync {
    fn submit(&self, request: HttpRequest, on_reply: ReplyCallback) -> Box<dyn InFlight>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn submit(&self, request: HttpRequest, on_reply: ReplyCallback) -> Box<dyn InFlight> {
        (**self).submit(request, on_reply)
    }
}

/// Upper bound on a single `UreqTransport` request, connect to last byte.
pub const DEFAULT_TRANSPORT_TIMEOUT: Duration = Duration::from_secs(30);

/// `Transport` backed by a blocking `ureq` agent, one worker thread per
/// request.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TRANSPORT_TIMEOUT)
    }

    /// Transport whose requests give up after `limit`, whether or not anyone
    /// is still waiting for them.
    pub fn with_timeout(limit: Duration) -> Self {
        // Status codes are data for the caller to classify, not errors.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .allow_non_standard_methods(true)
            .timeout_global(Some(limit))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

struct CancelFlag(Arc<AtomicBool>);

impl InFlight for CancelFlag {
    fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}

type CallbackSlot = Arc<Mutex<Option<ReplyCallback>>>;

fn deliver(slot: &CallbackSlot, reply: TransportReply) {
    let callback = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(callback) = callback {
        callback(reply);
    }
}

impl Transport for UreqTransport {
    fn submit(&self, request: HttpRequest, on_reply: ReplyCallback) -> Box<dyn InFlight> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let slot: CallbackSlot = Arc::new(Mutex::new(Some(on_reply)));

        let worker_cancelled = Arc::clone(&cancelled);
        let worker_slot = Arc::clone(&slot);
        let agent = self.agent.clone();
        let spawned = thread::Builder::new()
            .name("feed-client-request".to_string())
            .spawn(move || {
                let reply = perform(&agent, request);
                if worker_cancelled.load(Ordering::Acquire) {
                    tracing::trace!("request cancelled before reply; dropping it");
                    return;
                }
                deliver(&worker_slot, reply);
            });
        if let Err(err) = spawned {
            deliver(&slot, TransportReply::failed(Box::new(err)));
        }

        Box::new(CancelFlag(cancelled))
    }
}

/// Execute `request` on the current thread.
fn perform(agent: &ureq::Agent, request: HttpRequest) -> TransportReply {
    let HttpRequest {
        method,
        url,
        headers,
        body,
        content_type,
    } = request;

    let mut builder = ureq::http::Request::builder()
        .method(method.as_str())
        .uri(url.as_str());
    for (name, value) in headers.iter() {
        builder = builder.header(name, value);
    }
    if let Some(content_type) = content_type {
        if !headers.contains("content-type") {
            builder = builder.header("content-type", content_type);
        }
    }

    let sent = match body {
        Some(bytes) => builder
            .body(bytes)
            .map_err(|e| -> TransportError { Box::new(e) })
            .and_then(|req| agent.run(req).map_err(|e| -> TransportError { Box::new(e) })),
        None => builder
            .body(())
            .map_err(|e| -> TransportError { Box::new(e) })
            .and_then(|req| agent.run(req).map_err(|e| -> TransportError { Box::new(e) })),
    };

    let mut response = match sent {
        Ok(response) => response,
        Err(err) => return TransportReply::failed(err),
    };

    let status = response.status().as_u16();
    let headers: HeaderSet = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    match response.body_mut().with_config().limit(u64::MAX).read_to_vec() {
        Ok(body) => TransportReply::response(status, headers, body),
        Err(err) => TransportReply::failed(Box::new(err)),
    }
}
