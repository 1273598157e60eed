//! Body buffering and log field rendering shared by the middleware

#[cfg(any(feature = "csrf", feature = "logging"))]
use bytes::Bytes;
#[cfg(any(feature = "logging", feature = "client"))]
use http::HeaderMap;
#[cfg(any(feature = "logging", feature = "client"))]
use serde_json::{Map, Value};
#[cfg(any(feature = "csrf", feature = "logging"))]
use tower::BoxError;

/// Read a whole body into memory
#[cfg(any(feature = "csrf", feature = "logging"))]
pub(crate) async fn collect_body<B>(body: B) -> Result<Bytes, BoxError>
where
    B: http_body::Body,
    B::Error: Into<BoxError>,
{
    use http_body_util::BodyExt;

    body.collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(Into::into)
}

/// Render a captured body for a log entry, pretty-printing valid JSON
#[cfg(any(feature = "logging", feature = "client"))]
pub(crate) fn body_field(bytes: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(json) => serde_json::to_string_pretty(&json)
            .map(Value::String)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned())),
        Err(_) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Render headers as `{name: "v1, v2"}`
#[cfg(any(feature = "logging", feature = "client"))]
pub(crate) fn headers_field(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        map.insert(name.as_str().to_string(), Value::String(joined));
    }
    Value::Object(map)
}

#[cfg(all(test, any(feature = "logging", feature = "client")))]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_json_body_is_pretty_printed() {
        let field = body_field(br#"{"name":"mortar"}"#);
        assert_eq!(field, Value::String("{\n  \"name\": \"mortar\"\n}".to_string()));
    }

    #[test]
    fn test_plain_body_is_kept() {
        assert_eq!(body_field(b"hello"), Value::String("hello".to_string()));
    }

    #[test]
    fn test_repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("text/html"));
        headers.append("accept", HeaderValue::from_static("application/json"));

        let field = headers_field(&headers);
        assert_eq!(field["accept"], "text/html, application/json");
    }
}
