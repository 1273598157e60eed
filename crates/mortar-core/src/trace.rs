//! Request trace identifiers

use http::{HeaderMap, HeaderValue};
use std::fmt;
use uuid::Uuid;

/// Header carrying the trace ID, both inbound and echoed back
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Trace identifier attached to a request.
///
/// Taken from the `X-Trace-ID` request header when present and non-empty,
/// otherwise a fresh UUID v4. Inserted into request extensions by the
/// incoming logging middleware.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceId(String);

impl TraceId {
    /// Generate a new random trace ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Read the trace ID from headers, generating one if absent
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| Self(value.to_string()))
            .unwrap_or_else(Self::generate)
    }

    /// The trace ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The trace ID as a header value, if it is valid header text
    pub fn to_header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.0).ok()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TraceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TraceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value_is_used() {
        let mut headers = HeaderMap::new();
        headers.insert(TRACE_ID_HEADER, HeaderValue::from_static("abc-123"));
        assert_eq!(TraceId::from_headers(&headers).as_str(), "abc-123");
    }

    #[test]
    fn test_missing_or_empty_header_generates_uuid() {
        let generated = TraceId::from_headers(&HeaderMap::new());
        assert!(Uuid::parse_str(generated.as_str()).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert(TRACE_ID_HEADER, HeaderValue::from_static(""));
        let generated = TraceId::from_headers(&headers);
        assert!(Uuid::parse_str(generated.as_str()).is_ok());
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(TraceId::generate(), TraceId::generate());
    }
}
