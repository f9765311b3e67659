//! `Future` adapter over the callback engine.
//!
//! `ResponseFuture` resolves once with the keyed outcome. Dropping it before
//! it resolves cancels the in-flight call. It carries no timeout of its own;
//! wrap it in `tokio::time::timeout` (or similar) to bound it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::engine::{self, RequestHandle};
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, KeyedResponse};
use crate::transport::Transport;

/// A keyed call in progress.
#[derive(Debug)]
pub struct ResponseFuture {
    rx: oneshot::Receiver<Result<KeyedResponse>>,
    handle: RequestHandle,
}

impl ResponseFuture {
    pub(crate) fn start(transport: &dyn Transport, request: HttpRequest) -> Self {
        let (tx, rx) = oneshot::channel();
        let handle = engine::execute_keyed(transport, request, move |outcome| {
            // The receiver is gone only if the future was dropped.
            let _ = tx.send(outcome);
        });
        Self { rx, handle }
    }

    pub(crate) fn failed(err: ApiError) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(err));
        Self {
            rx,
            handle: RequestHandle::finished(),
        }
    }

    pub fn handle(&self) -> &RequestHandle {
        &self.handle
    }
}

impl Future for ResponseFuture {
    type Output = Result<KeyedResponse>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // The transport dropped the request without ever answering.
            Poll::Ready(Err(_)) => Poll::Ready(Err(ApiError::NoHttpResponse)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ResponseFuture {
    fn drop(&mut self) {
        if self.handle.cancel() {
            tracing::debug!("response future dropped; request cancelled");
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
    use std::time::Duration;

    fn get() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: "http://h/me".to_string(),
            headers: HeaderSet::new(),
            body: None,
            content_type: None,
        }
    }

    #[tokio::test]
    async fn resolves_with_decoded_body() {
        let transport = StubTransport::replying([TransportReply::response(
            200,
            HeaderSet::new(),
            br#"{"name":"Ada"}"#.to_vec(),
        )]);
        let response = ResponseFuture::start(&transport, get()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.data["name"], "Ada");
    }

    #[tokio::test]
    async fn dropping_the_future_cancels_the_call() {
        let transport = StubTransport::holding();
        let future = ResponseFuture::start(&transport, get());
        let waited = tokio::time::timeout(Duration::from_millis(20), future).await;
        assert!(waited.is_err());
        assert_eq!(transport.cancellations(), 1);
    }

    #[tokio::test]
    async fn immediate_failure_resolves_without_transport() {
        let future = ResponseFuture::failed(ApiError::SerializationError("bad".into()));
        assert_eq!(future.handle().state(), CallState::Completed);
        let err = future.await.unwrap_err();
        assert!(matches!(err, ApiError::SerializationError(_)));
    }
}
