//! Request assembly: header merging and body encoding.
//!
//! # Design
//! Header sets are applied in the order given and every pair is kept, so the
//! resulting header list is the plain concatenation of the inputs. The client
//! always passes its default set first and the per-call set second.
//!
//! Keyed bodies are encoded here, before anything reaches the transport, so
//! an unencodable body fails the call without a request ever being issued.

use crate::codec::{self, KeyedData};
use crate::error::Result;
use crate::http::{HeaderSet, HttpMethod, HttpRequest};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Encoded as a JSON object.
    Keyed(KeyedData),
    /// Sent unchanged.
    Raw(Vec<u8>),
}

impl From<KeyedData> for RequestBody {
    fn from(data: KeyedData) -> Self {
        RequestBody::Keyed(data)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Raw(bytes)
    }
}

/// Build a request from its parts.
pub fn build_request(
    method: HttpMethod,
    url: &str,
    header_sets: &[&HeaderSet],
    body: Option<RequestBody>,
) -> Result<HttpRequest> {
    let (body, content_type) = match body {
        Some(RequestBody::Keyed(data)) => (Some(codec::encode_keyed(&data)?), Some(JSON_CONTENT_TYPE)),
        Some(RequestBody::Raw(bytes)) => (Some(bytes), None),
        None => (None, None),
    };

    let mut headers = HeaderSet::new();
    for set in header_sets {
        headers.extend_from(set);
    }

    Ok(HttpRequest {
        method,
        url: url.to_string(),
        headers,
        body,
        content_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_sets_are_concatenated_in_call_order() {
        let defaults = HeaderSet::new()
            .with("Authorization", "Bearer t")
            .with("X-Trace", "1");
        let call = HeaderSet::new().with("X-Trace", "2").with("Accept", "application/json");

        let req = build_request(HttpMethod::Get, "http://h/x", &[&defaults, &call], None).unwrap();
        assert_eq!(
            req.headers.into_vec(),
            vec![
                ("Authorization".to_string(), "Bearer t".to_string()),
                ("X-Trace".to_string(), "1".to_string()),
                ("X-Trace".to_string(), "2".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ]
        );
    }

    #[test]
    fn no_header_sets_yields_no_headers() {
        let req = build_request(HttpMethod::Delete, "http://h/x", &[], None).unwrap();
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
        assert!(req.content_type.is_none());
    }

    #[test]
    fn keyed_body_is_encoded_as_json() {
        let mut data = KeyedData::new();
        data.insert("name".into(), json!("Ada"));
        let req = build_request(HttpMethod::Post, "http://h/users", &[], Some(data.into())).unwrap();
        let body: serde_json::Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "Ada"}));
        assert_eq!(req.content_type, Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn raw_body_passes_through_unchanged() {
        let bytes = vec![0xff, 0x00, b'x'];
        let req = build_request(
            HttpMethod::Put,
            "http://h/blob",
            &[],
            Some(RequestBody::Raw(bytes.clone())),
        )
        .unwrap();
        assert_eq!(req.body, Some(bytes));
        assert!(req.content_type.is_none());
    }
}
