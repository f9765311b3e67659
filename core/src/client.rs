//! `HttpClient`: a session bound to one base URL.
//!
//! # Design
//! The client owns the base URL, the default timeout, the default header set
//! and the transport. Every call resolves its endpoint against the base URL,
//! merges the default headers with the call's own headers (defaults first)
//! and hands the request to one of three execution styles:
//!
//! - blocking (`get`, `post`, `request`, ...), bounded by a timeout,
//! - callback (`get_async`, `get_raw`, ...), returning a `RequestHandle`,
//! - future (`fetch`), resolving once and cancelling on drop.
//!
//! Keyed methods send and receive JSON objects; raw methods pass bytes
//! through and never decode.
//!
//! Clones share the default header set, so a login through one clone is seen
//! by all of them. Header writes (login, logout) are not ordered against
//! concurrent in-flight calls; callers that mix them should serialize.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;

use crate::blocking::{self, DEFAULT_TIMEOUT};
use crate::codec::KeyedData;
use crate::config::ClientConfig;
use crate::engine::{self, RequestHandle};
use crate::error::Result;
use crate::future::ResponseFuture;
use crate::http::{HeaderSet, HttpMethod, HttpRequest, HttpResponse, KeyedResponse};
use crate::request::{build_request, RequestBody};
use crate::transport::{Transport, UreqTransport};

#[derive(Clone)]
pub struct HttpClient {
    base_url: String,
    default_timeout: Duration,
    default_headers: Arc<RwLock<HeaderSet>>,
    transport: Arc<dyn Transport>,
}

impl HttpClient {
    /// Client for `base_url` over the default `ureq` transport.
    pub fn new(base_url: &str) -> Self {
        Self::with_transport(base_url, UreqTransport::new())
    }

    pub fn with_transport(base_url: &str, transport: impl Transport + 'static) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_timeout: DEFAULT_TIMEOUT,
            default_headers: Arc::new(RwLock::new(HeaderSet::new())),
            transport: Arc::new(transport),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_transport(&config.base_url, UreqTransport::with_timeout(config.transport_timeout()))
            .with_default_timeout(config.default_timeout())
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Snapshot of the headers sent with every call.
    pub fn default_headers(&self) -> HeaderSet {
        self.read_defaults().clone()
    }

    /// Set a default header, replacing any existing entries of that name.
    pub fn set_default_header(&self, name: &str, value: &str) {
        self.default_headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, value);
    }

    pub fn remove_default_header(&self, name: &str) -> bool {
        self.default_headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Absolute URL for `endpoint`.
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn read_defaults(&self) -> RwLockReadGuard<'_, HeaderSet> {
        self.default_headers.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn prepare(
        &self,
        method: HttpMethod,
        endpoint: &str,
        headers: &HeaderSet,
        body: Option<RequestBody>,
    ) -> Result<HttpRequest> {
        let defaults = self.read_defaults();
        build_request(method, &self.url(endpoint), &[&*defaults, headers], body)
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    // ---------------------------------------------------------------------
    // Blocking
    // ---------------------------------------------------------------------

    /// Blocking call with a keyed body in and the raw body out.
    pub fn request_data(
        &self,
        method: HttpMethod,
        endpoint: &str,
        headers: &HeaderSet,
        body: Option<KeyedData>,
        timeout: Duration,
    ) -> Result<HttpResponse> {
        let request = self.prepare(method, endpoint, headers, body.map(RequestBody::Keyed))?;
        blocking::execute_blocking(self.transport(), request, timeout)
    }

    pub fn request_with_timeout(
        &self,
        method: HttpMethod,
        endpoint: &str,
        headers: &HeaderSet,
        body: Option<KeyedData>,
        timeout: Duration,
    ) -> Result<KeyedResponse> {
        self.request_data(method, endpoint, headers, body, timeout)?
            .into_keyed()
    }

    /// Blocking keyed call bounded by the client's default timeout.
    pub fn request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        headers: &HeaderSet,
        body: Option<KeyedData>,
    ) -> Result<KeyedResponse> {
        self.request_with_timeout(method, endpoint, headers, body, self.default_timeout)
    }

    pub fn get(&self, endpoint: &str, headers: &HeaderSet) -> Result<KeyedResponse> {
        self.request(HttpMethod::Get, endpoint, headers, None)
    }

    pub fn delete(&self, endpoint: &str, headers: &HeaderSet) -> Result<KeyedResponse> {
        self.request(HttpMethod::Delete, endpoint, headers, None)
    }

    pub fn put(&self, endpoint: &str, headers: &HeaderSet, body: KeyedData) -> Result<KeyedResponse> {
        self.request(HttpMethod::Put, endpoint, headers, Some(body))
    }

    pub fn post(&self, endpoint: &str, headers: &HeaderSet, body: KeyedData) -> Result<KeyedResponse> {
        self.request(HttpMethod::Post, endpoint, headers, Some(body))
    }

    // ---------------------------------------------------------------------
    // Callback, keyed
    // ---------------------------------------------------------------------

    /// Start a keyed call; `completion` runs exactly once, possibly on
    /// another thread. A body that cannot be encoded fails immediately,
    /// before anything is sent.
    pub fn request_async<F>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        headers: &HeaderSet,
        body: Option<KeyedData>,
        completion: F,
    ) -> RequestHandle
    where
        F: FnOnce(Result<KeyedResponse>) + Send + 'static,
    {
        match self.prepare(method, endpoint, headers, body.map(RequestBody::Keyed)) {
            Ok(request) => engine::execute_keyed(self.transport(), request, completion),
            Err(err) => {
                completion(Err(err));
                RequestHandle::finished()
            }
        }
    }

    pub fn get_async<F>(&self, endpoint: &str, headers: &HeaderSet, completion: F) -> RequestHandle
    where
        F: FnOnce(Result<KeyedResponse>) + Send + 'static,
    {
        self.request_async(HttpMethod::Get, endpoint, headers, None, completion)
    }

    pub fn delete_async<F>(&self, endpoint: &str, headers: &HeaderSet, completion: F) -> RequestHandle
    where
        F: FnOnce(Result<KeyedResponse>) + Send + 'static,
    {
        self.request_async(HttpMethod::Delete, endpoint, headers, None, completion)
    }

    pub fn put_async<F>(
        &self,
        endpoint: &str,
        headers: &HeaderSet,
        body: KeyedData,
        completion: F,
    ) -> RequestHandle
    where
        F: FnOnce(Result<KeyedResponse>) + Send + 'static,
    {
        self.request_async(HttpMethod::Put, endpoint, headers, Some(body), completion)
    }

    pub fn post_async<F>(
        &self,
        endpoint: &str,
        headers: &HeaderSet,
        body: KeyedData,
        completion: F,
    ) -> RequestHandle
    where
        F: FnOnce(Result<KeyedResponse>) + Send + 'static,
    {
        self.request_async(HttpMethod::Post, endpoint, headers, Some(body), completion)
    }

    // ---------------------------------------------------------------------
    // Callback, raw
    // ---------------------------------------------------------------------

    /// Start a call whose body is sent as-is and whose response body is
    /// returned undecoded.
    pub fn request_raw<F>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        headers: &HeaderSet,
        body: Option<Vec<u8>>,
        completion: F,
    ) -> RequestHandle
    where
        F: FnOnce(Result<HttpResponse>) + Send + 'static,
    {
        match self.prepare(method, endpoint, headers, body.map(RequestBody::Raw)) {
            Ok(request) => engine::execute(self.transport(), request, completion),
            Err(err) => {
                completion(Err(err));
                RequestHandle::finished()
            }
        }
    }

    pub fn get_raw<F>(&self, endpoint: &str, headers: &HeaderSet, completion: F) -> RequestHandle
    where
        F: FnOnce(Result<HttpResponse>) + Send + 'static,
    {
        self.request_raw(HttpMethod::Get, endpoint, headers, None, completion)
    }

    pub fn delete_raw<F>(&self, endpoint: &str, headers: &HeaderSet, completion: F) -> RequestHandle
    where
        F: FnOnce(Result<HttpResponse>) + Send + 'static,
    {
        self.request_raw(HttpMethod::Delete, endpoint, headers, None, completion)
    }

    pub fn put_raw<F>(
        &self,
        endpoint: &str,
        headers: &HeaderSet,
        body: Option<Vec<u8>>,
        completion: F,
    ) -> RequestHandle
    where
        F: FnOnce(Result<HttpResponse>) + Send + 'static,
    {
        self.request_raw(HttpMethod::Put, endpoint, headers, body, completion)
    }

    pub fn post_raw<F>(
        &self,
        endpoint: &str,
        headers: &HeaderSet,
        body: Option<Vec<u8>>,
        completion: F,
    ) -> RequestHandle
    where
        F: FnOnce(Result<HttpResponse>) + Send + 'static,
    {
        self.request_raw(HttpMethod::Post, endpoint, headers, body, completion)
    }

    // ---------------------------------------------------------------------
    // Future
    // ---------------------------------------------------------------------

    /// Start a keyed call and return a future for its outcome.
    pub fn fetch(
        &self,
        method: HttpMethod,
        endpoint: &str,
        headers: &HeaderSet,
        body: Option<KeyedData>,
    ) -> ResponseFuture {
        match self.prepare(method, endpoint, headers, body.map(RequestBody::Keyed)) {
            Ok(request) => ResponseFuture::start(self.transport(), request),
            Err(err) => ResponseFuture::failed(err),
        }
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Header values are left out; they may hold credentials.
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("default_timeout", &self.default_timeout)
            .field("default_headers", &self.read_defaults().len())
            .finish_non_exhaustive()
    }
}
