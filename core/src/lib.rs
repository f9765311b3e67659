//! HTTP client for a JSON feed service with a bearer-token session.
//!
//! # Overview
//! `HttpClient` talks to a single base URL. Requests carry JSON objects
//! (`KeyedData`) or raw bytes, and every call can run three ways:
//! blocking with a timeout, through a completion callback, or as a future.
//! Network I/O is delegated to a `Transport`; `UreqTransport` is the default.
//!
//! # Design
//! - `request` merges header sets and encodes bodies before any I/O.
//! - `engine` issues exactly one request per call and settles it exactly
//!   once: completed or cancelled.
//! - `blocking` waits on the engine with a deadline and cancels on expiry.
//! - `auth` keeps the session's bearer token in the default header set.
//! - Errors are one `ApiError` enum; nothing is retried internally.

pub mod auth;
pub mod blocking;
pub mod client;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod future;
pub mod http;
pub mod request;
pub mod transport;

#[cfg(test)]
mod testing;

pub use auth::AUTHORIZATION;
pub use blocking::{execute_blocking, DEFAULT_TIMEOUT};
pub use client::HttpClient;
pub use codec::KeyedData;
pub use config::ClientConfig;
pub use engine::{CallState, RequestHandle};
pub use error::{ApiError, Result, TransportError};
pub use future::ResponseFuture;
pub use http::{HeaderSet, HttpMethod, HttpRequest, HttpResponse, KeyedResponse, ResponseHead};
pub use request::{build_request, RequestBody};
pub use transport::{
    InFlight, ReplyCallback, Transport, TransportReply, UreqTransport, DEFAULT_TRANSPORT_TIMEOUT,
};
