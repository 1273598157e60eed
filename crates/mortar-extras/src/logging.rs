//! Incoming request logging with trace ID propagation
//!
//! [`IncomingLoggingLayer`] tags every request with a [`TraceId`] (taken from
//! `X-Trace-ID` or freshly generated), echoes it on the response and, once
//! the response is ready, emits one structured entry:
//!
//! | field | value |
//! |---|---|
//! | `trace.id` | the trace ID |
//! | `http.request.method` | request method |
//! | `http.route` | request path |
//! | `server.address` | `Host` header, or the URI authority |
//! | `http.response.status_code` | response status |
//! | `http.response.latency` | handler time, e.g. `"1.52ms"` |
//!
//! The entry is logged as `incoming request completed` (info),
//! `incoming request warning` (4xx) or `incoming request failed` (5xx).
//! Bodies and request headers are added on request.
//!
//! # Example
//!
//! ```rust,ignore
//! use mortar_core::JsonLogger;
//! use mortar_extras::logging::IncomingLoggingLayer;
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .layer(
//!         IncomingLoggingLayer::new()
//!             .with_field("service", "billing")
//!             .with_request_body()
//!             .with_logger(JsonLogger::stdout()),
//!     )
//!     .service(app);
//! ```

use crate::body::{body_field, collect_body, headers_field};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::{header, HeaderValue, Request, Response};
use mortar_core::{ApiError, JsonLogger, LogSink, TraceId, TRACE_ID_HEADER};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{BoxError, Layer, Service};

#[derive(Debug, Clone, Default)]
struct LoggingOptions {
    fields: Map<String, Value>,
    request_body: bool,
    response_body: bool,
    headers: bool,
    skip_paths: Vec<String>,
    sink: LogSink,
}

/// Layer logging each incoming request/response pair
#[derive(Debug, Clone, Default)]
pub struct IncomingLoggingLayer {
    options: Arc<LoggingOptions>,
}

impl IncomingLoggingLayer {
    /// Log through `tracing` with no bodies or headers
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a custom field to every entry
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Arc::make_mut(&mut self.options)
            .fields
            .insert(key.into(), value.into());
        self
    }

    /// Add several custom fields to every entry
    pub fn with_fields<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let options = Arc::make_mut(&mut self.options);
        for (key, value) in fields {
            options.fields.insert(key.into(), value.into());
        }
        self
    }

    /// Buffer and log the request body
    pub fn with_request_body(mut self) -> Self {
        Arc::make_mut(&mut self.options).request_body = true;
        self
    }

    /// Buffer and log the response body
    pub fn with_response_body(mut self) -> Self {
        Arc::make_mut(&mut self.options).response_body = true;
        self
    }

    /// Log request headers
    pub fn with_headers(mut self) -> Self {
        Arc::make_mut(&mut self.options).headers = true;
        self
    }

    /// Don't log requests whose path starts with `prefix`.
    ///
    /// Trace IDs are still assigned and echoed.
    pub fn skip_path(mut self, prefix: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.options)
            .skip_paths
            .push(prefix.into());
        self
    }

    /// Send entries to `sink`
    pub fn with_sink(mut self, sink: LogSink) -> Self {
        Arc::make_mut(&mut self.options).sink = sink;
        self
    }

    /// Send entries to an explicit JSON logger instead of `tracing`
    pub fn with_logger(self, logger: impl Into<Arc<JsonLogger>>) -> Self {
        self.with_sink(LogSink::Json(logger.into()))
    }
}

impl<S> Layer<S> for IncomingLoggingLayer {
    type Service = IncomingLogging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IncomingLogging {
            inner,
            options: self.options.clone(),
        }
    }
}

/// Service produced by [`IncomingLoggingLayer`]
#[derive(Debug, Clone)]
pub struct IncomingLogging<S> {
    inner: S,
    options: Arc<LoggingOptions>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for IncomingLogging<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: http_body::Body + From<Bytes> + Send + 'static,
    ReqBody::Data: Send,
    ReqBody::Error: Into<BoxError>,
    ResBody: http_body::Body + From<Bytes> + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let options = self.options.clone();

        let start = Instant::now();
        let trace_id = TraceId::from_headers(req.headers());
        req.extensions_mut().insert(trace_id.clone());

        let skipped = options
            .skip_paths
            .iter()
            .any(|prefix| req.uri().path().starts_with(prefix.as_str()));

        if skipped {
            return Box::pin(async move {
                let mut response = inner.call(req).await?;
                echo_trace_id(&mut response, &trace_id);
                Ok(response)
            });
        }

        let mut fields = Map::new();
        fields.insert("trace.id".into(), trace_id.as_str().into());
        fields.insert("http.request.method".into(), req.method().as_str().into());
        fields.insert("http.route".into(), req.uri().path().into());
        fields.insert("server.address".into(), server_address(&req).into());
        if options.headers {
            fields.insert("http.request.headers".into(), headers_field(req.headers()));
        }

        Box::pin(async move {
            let req = if options.request_body {
                let (parts, body) = req.into_parts();
                match collect_body(body).await {
                    Ok(bytes) => {
                        if !bytes.is_empty() {
                            fields.insert("http.request.body".into(), body_field(&bytes));
                        }
                        Request::from_parts(parts, ReqBody::from(bytes))
                    }
                    Err(err) => {
                        options.sink.warn(
                            "Failed to read request body",
                            json!({ "trace.id": trace_id.as_str(), "error": err.to_string() }),
                        );
                        let mut response: Response<ResBody> =
                            ApiError::bad_request("Failed to read request body").into_response();
                        echo_trace_id(&mut response, &trace_id);
                        return Ok(response);
                    }
                }
            } else {
                req
            };

            let response = inner.call(req).await?;

            let mut response = if options.response_body {
                let (parts, body) = response.into_parts();
                match collect_body(body).await {
                    Ok(bytes) => {
                        if !bytes.is_empty() {
                            fields.insert("http.response.body".into(), body_field(&bytes));
                        }
                        Response::from_parts(parts, ResBody::from(bytes))
                    }
                    Err(err) => {
                        options.sink.warn(
                            "Failed to read response body",
                            json!({ "trace.id": trace_id.as_str(), "error": err.to_string() }),
                        );
                        ApiError::internal("Failed to read response body").into_response()
                    }
                }
            } else {
                response
            };

            echo_trace_id(&mut response, &trace_id);

            let status = response.status().as_u16();
            fields.insert("http.response.status_code".into(), status.into());
            fields.insert(
                "http.response.latency".into(),
                format!("{:?}", start.elapsed()).into(),
            );
            for (key, value) in &options.fields {
                fields.insert(key.clone(), value.clone());
            }

            options
                .sink
                .by_status(status, "incoming request", Value::Object(fields));

            Ok(response)
        })
    }
}

fn echo_trace_id<B>(response: &mut Response<B>, trace_id: &TraceId) {
    if let Some(value) = trace_id.to_header_value() {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
}

fn server_address<B>(req: &Request<B>) -> String {
    req.headers()
        .get(header::HOST)
        .and_then(|value: &HeaderValue| value.to_str().ok())
        .map(str::to_owned)
        .or_else(|| req.uri().authority().map(|authority| authority.to_string()))
        .unwrap_or_default()
}
