//! Logging wrapper for outgoing HTTP calls
//!
//! [`OutgoingLogger`] sends requests through a `reqwest::Client`, forwards
//! the caller's trace ID in `X-Trace-ID` and logs each call with the same
//! field names as the incoming middleware (`server.address` is the target
//! host). Transport errors are logged at error level with an `error` field.
//!
//! ```rust,ignore
//! use mortar_extras::client::OutgoingLogger;
//!
//! let client = OutgoingLogger::new(reqwest::Client::new()).with_response_body();
//! let trace_id = req.extensions().get::<TraceId>();
//! let response = client
//!     .send(client.client().get("https://inventory.internal/items"), trace_id)
//!     .await?;
//! ```

use crate::body::{body_field, headers_field};
use mortar_core::{JsonLogger, LogSink, TraceId, TRACE_ID_HEADER};
use reqwest::{Request, RequestBuilder, Response, ResponseBuilderExt};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

/// `reqwest::Client` wrapper logging every call
#[derive(Debug, Clone, Default)]
pub struct OutgoingLogger {
    client: reqwest::Client,
    fields: Map<String, Value>,
    request_body: bool,
    response_body: bool,
    headers: bool,
    sink: LogSink,
}

impl OutgoingLogger {
    /// Wrap a client, logging through `tracing`
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            ..Self::default()
        }
    }

    /// The wrapped client, for building requests
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Add a custom field to every entry
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add several custom fields to every entry
    pub fn with_fields<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in fields {
            self.fields.insert(key.into(), value.into());
        }
        self
    }

    /// Log in-memory request bodies; streaming bodies are never read
    pub fn with_request_body(mut self) -> Self {
        self.request_body = true;
        self
    }

    /// Buffer and log response bodies
    pub fn with_response_body(mut self) -> Self {
        self.response_body = true;
        self
    }

    /// Log request and response headers
    pub fn with_headers(mut self) -> Self {
        self.headers = true;
        self
    }

    /// Send entries to `sink`
    pub fn with_sink(mut self, sink: LogSink) -> Self {
        self.sink = sink;
        self
    }

    /// Send entries to an explicit JSON logger instead of `tracing`
    pub fn with_logger(self, logger: impl Into<Arc<JsonLogger>>) -> Self {
        self.with_sink(LogSink::Json(logger.into()))
    }

    /// Build and [`execute`](Self::execute) a request
    pub async fn send(
        &self,
        builder: RequestBuilder,
        trace_id: Option<&TraceId>,
    ) -> Result<Response, reqwest::Error> {
        let request = builder.build()?;
        self.execute(request, trace_id).await
    }

    /// Execute a request and log it.
    ///
    /// The trace ID is `trace_id` when given, otherwise any `X-Trace-ID`
    /// already on the request. When response bodies are logged the body is
    /// buffered and the returned response carries the buffered copy.
    pub async fn execute(
        &self,
        mut request: Request,
        trace_id: Option<&TraceId>,
    ) -> Result<Response, reqwest::Error> {
        let trace_id = trace_id
            .cloned()
            .or_else(|| {
                request
                    .headers()
                    .get(TRACE_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .filter(|value| !value.is_empty())
                    .map(TraceId::from)
            });
        if let Some(value) = trace_id.as_ref().and_then(TraceId::to_header_value) {
            request.headers_mut().insert(TRACE_ID_HEADER, value);
        }

        let mut fields = Map::new();
        if let Some(trace_id) = &trace_id {
            fields.insert("trace.id".into(), trace_id.as_str().into());
        }
        fields.insert("http.request.method".into(), request.method().as_str().into());
        fields.insert("http.route".into(), request.url().path().into());
        fields.insert("server.address".into(), server_address(request.url()).into());

        if self.request_body {
            if let Some(bytes) = request.body().and_then(|body| body.as_bytes()) {
                if !bytes.is_empty() {
                    fields.insert("http.request.body".into(), body_field(bytes));
                }
            }
        }
        if self.headers {
            fields.insert("http.request.headers".into(), headers_field(request.headers()));
        }

        let start = Instant::now();
        let result = self.client.execute(request).await;
        fields.insert(
            "http.response.latency".into(),
            format!("{:?}", start.elapsed()).into(),
        );

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                self.emit(500, fields, Some(&err));
                return Err(err);
            }
        };

        let status = response.status().as_u16();
        fields.insert("http.response.status_code".into(), status.into());
        if self.headers {
            fields.insert("http.response.headers".into(), headers_field(response.headers()));
        }

        if !self.response_body {
            self.emit(status, fields, None);
            return Ok(response);
        }

        let url = response.url().clone();
        let status_code = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                self.emit(status, fields, Some(&err));
                return Err(err);
            }
        };
        if !bytes.is_empty() {
            fields.insert("http.response.body".into(), body_field(&bytes));
        }
        self.emit(status, fields, None);

        let (mut parts, ()) = http::Response::builder()
            .url(url)
            .body(())
            .unwrap_or_default()
            .into_parts();
        parts.status = status_code;
        parts.version = version;
        parts.headers = headers;
        Ok(Response::from(http::Response::from_parts(parts, bytes)))
    }

    fn emit(&self, status: u16, mut fields: Map<String, Value>, error: Option<&reqwest::Error>) {
        if let Some(err) = error {
            fields.insert("error".into(), err.to_string().into());
        }
        for (key, value) in &self.fields {
            fields.insert(key.clone(), value.clone());
        }
        self.sink
            .by_status(status, "outgoing request", Value::Object(fields));
    }
}

fn server_address(url: &reqwest::Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mortar_core::CaptureWriter;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP/1.1 response and hand back the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (addr, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        body.len() >= length
    }

    fn logger() -> (OutgoingLogger, CaptureWriter) {
        let capture = CaptureWriter::new();
        let logger =
            OutgoingLogger::new(reqwest::Client::new()).with_logger(JsonLogger::new(capture.clone()));
        (logger, capture)
    }

    #[tokio::test]
    async fn test_forwards_trace_id_and_logs_call() {
        let (addr, server) = serve_once("200 OK", r#"{"ok":true}"#).await;
        let (logger, capture) = logger();
        let logger = logger.with_field("peer", "inventory");
        let trace_id = TraceId::from("trace-abc");

        let response = logger
            .send(
                logger.client().get(format!("http://{addr}/items")),
                Some(&trace_id),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let raw = server.await.unwrap().to_ascii_lowercase();
        assert!(raw.contains("x-trace-id: trace-abc"));

        let entries = capture.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["level"], "INFO");
        assert_eq!(entries[0]["message"], "outgoing request completed");

        let fields = &entries[0]["fields"];
        assert_eq!(fields["trace.id"], "trace-abc");
        assert_eq!(fields["http.request.method"], "GET");
        assert_eq!(fields["http.route"], "/items");
        assert_eq!(fields["server.address"], addr.to_string());
        assert_eq!(fields["http.response.status_code"], 200);
        assert_eq!(fields["peer"], "inventory");
        assert!(fields.get("http.response.body").is_none());
    }

    #[tokio::test]
    async fn test_response_body_is_logged_and_still_readable() {
        let (addr, _server) = serve_once("404 Not Found", r#"{"error":"missing"}"#).await;
        let (logger, capture) = logger();
        let logger = logger.with_request_body().with_response_body().with_headers();

        let response = logger
            .send(
                logger
                    .client()
                    .post(format!("http://{addr}/items/9"))
                    .body(r#"{"qty":1}"#),
                None,
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 404);
        assert_eq!(response.url().path(), "/items/9");
        assert_eq!(response.text().await.unwrap(), r#"{"error":"missing"}"#);

        let entry = &capture.entries()[0];
        assert_eq!(entry["level"], "WARN");
        assert_eq!(entry["message"], "outgoing request warning");

        let fields = &entry["fields"];
        assert!(fields.get("trace.id").is_none());
        assert_eq!(fields["http.request.body"], "{\n  \"qty\": 1\n}");
        assert_eq!(fields["http.response.body"], "{\n  \"error\": \"missing\"\n}");
        assert_eq!(fields["http.response.headers"]["content-type"], "application/json");
    }

    #[tokio::test]
    async fn test_existing_trace_header_is_kept() {
        let (addr, server) = serve_once("204 No Content", "").await;
        let (logger, capture) = logger();

        logger
            .send(
                logger
                    .client()
                    .delete(format!("http://{addr}/items/1"))
                    .header("x-trace-id", "from-header"),
                None,
            )
            .await
            .unwrap();

        assert!(server
            .await
            .unwrap()
            .to_ascii_lowercase()
            .contains("x-trace-id: from-header"));
        assert_eq!(capture.entries()[0]["fields"]["trace.id"], "from-header");
    }

    #[tokio::test]
    async fn test_transport_error_is_logged() {
        let (logger, capture) = logger();

        let result = logger
            .send(logger.client().get("http://127.0.0.1:1/unreachable"), None)
            .await;
        assert!(result.is_err());

        let entry = &capture.entries()[0];
        assert_eq!(entry["level"], "ERROR");
        assert_eq!(entry["message"], "outgoing request failed");
        assert!(entry["fields"]["error"].is_string());
        assert!(entry["fields"].get("http.response.status_code").is_none());
    }

    #[test]
    fn test_server_address() {
        let url = reqwest::Url::parse("https://api.example.com/v1").unwrap();
        assert_eq!(server_address(&url), "api.example.com");

        let url = reqwest::Url::parse("http://localhost:8080/").unwrap();
        assert_eq!(server_address(&url), "localhost:8080");
    }
}
