//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::http::HttpRequest;
use crate::transport::{InFlight, ReplyCallback, Transport, TransportReply};

/// Replies from a queue on a worker thread; once the queue is empty, holds
/// callbacks until `release` is called (or forever).
#[derive(Default)]
pub(crate) struct StubTransport {
    replies: Mutex<VecDeque<TransportReply>>,
    held: Mutex<VecDeque<ReplyCallback>>,
    requests: Mutex<Vec<HttpRequest>>,
    cancels: Arc<AtomicUsize>,
}

impl StubTransport {
    pub(crate) fn replying(replies: impl IntoIterator<Item = TransportReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Never answers on its own.
    pub(crate) fn holding() -> Self {
        Self::default()
    }

    /// Fire the oldest held callback on the current thread.
    pub(crate) fn release(&self, reply: TransportReply) {
        let callback = self.held.lock().unwrap().pop_front().expect("no held request");
        callback(reply);
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn cancellations(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

struct StubInFlight(Arc<AtomicUsize>);

impl InFlight for StubInFlight {
    fn cancel(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl Transport for StubTransport {
    fn submit(&self, request: HttpRequest, on_reply: ReplyCallback) -> Box<dyn InFlight> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => {
                thread::spawn(move || on_reply(reply));
            }
            None => self.held.lock().unwrap().push_back(on_reply),
        }
        Box::new(StubInFlight(Arc::clone(&self.cancels)))
    }
}
