//! HTTP request and response types exchanged with the transport.
//!
//! # Design
//! Requests and responses are plain owned data. `HttpClient` assembles an
//! `HttpRequest`, the `Transport` executes it, and whatever comes back is
//! normalized into an `HttpResponse` (bytes) or a `KeyedResponse` (decoded
//! JSON object).
//!
//! Headers are an ordered list of pairs rather than a map: repeated names are
//! legal in HTTP, and merging header sets appends instead of overriding.

use std::fmt;

use serde::de::DeserializeOwned;

use crate::codec::{self, KeyedData};
use crate::error::Result;

/// HTTP method for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    /// Any other verb, sent verbatim.
    Custom(String),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Custom(method) => method,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered `(name, value)` pairs. Names compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pair, keeping any existing entries with the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Builder form of `append`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    /// Replace every entry named `name` with a single `(name, value)` pair.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.entries.push((name, value.into()));
    }

    /// Remove every entry named `name`. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.entries.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append every pair of `other`, in order.
    pub fn extend_from(&mut self, other: &HeaderSet) {
        self.entries.extend(other.entries.iter().cloned());
    }

    pub fn into_vec(self) -> Vec<(String, String)> {
        self.entries
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect(),
        }
    }
}

/// A fully assembled request, built once per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HeaderSet,
    pub body: Option<Vec<u8>>,
    /// Content type implied by the body encoding. The transport applies it
    /// only when `headers` carries no explicit content type.
    pub content_type: Option<&'static str>,
}

/// Status line and headers of a response, without the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: HeaderSet,
}

/// A response with its body left as bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderSet,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Decode the body as a JSON object.
    pub fn keyed(&self) -> Result<KeyedData> {
        codec::decode_keyed(&self.body)
    }

    /// Decode the body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        codec::decode_typed(&self.body)
    }

    pub(crate) fn into_keyed(self) -> Result<KeyedResponse> {
        let data = codec::decode_keyed(&self.body)?;
        Ok(KeyedResponse {
            status: self.status,
            headers: self.headers,
            data,
        })
    }
}

/// A response whose body was decoded as a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedResponse {
    pub status: u16,
    pub headers: HeaderSet,
    pub data: KeyedData,
}
