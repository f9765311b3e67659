//! Error types for the feed HTTP client.
//!
//! # Design
//! A single `ApiError` covers the request pipeline (assembly, transport,
//! decoding, timeouts) and the session flows (login, user creation). Callers
//! match on the variant; nothing here is retried or swallowed on their behalf.
//!
//! Transport failures are kept as the transport's own error value behind
//! `TransportError`, reachable through `std::error::Error::source`, so a
//! caller can downcast to e.g. `ureq::Error` or `std::io::Error`.

use thiserror::Error;

/// The underlying transport's failure, preserved as-is.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by `HttpClient` and the request engine.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The blocking call's deadline passed before the transport answered.
    #[error("request timed out")]
    Timeout,

    /// The transport reported a failure (connection refused, reset, ...).
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// The transport finished without producing an HTTP response.
    #[error("no HTTP response")]
    NoHttpResponse,

    /// A response arrived but carried no body.
    #[error("no data in response")]
    NoData,

    /// The response body is not JSON of the requested shape.
    #[error("cannot decode data: {0}")]
    CannotDecodeData(String),

    /// The request body could not be encoded as a JSON object.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// Login returned 401.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// Login returned a status other than 200 or 401.
    #[error("unknown login failure")]
    UnknownLoginFailure,

    /// Login succeeded but the response held no usable token.
    #[error("no bearer token, not logged in")]
    NoBearerToken,

    /// User creation returned 409.
    #[error("user already exists")]
    UserAlreadyExists,

    /// User creation returned a status other than 200 or 409.
    #[error("cannot create user")]
    CannotCreateUser,
}

impl ApiError {
    /// Wrap any transport-level error.
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ApiError::Transport(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
