//! Error types and the JSON status envelope

use bytes::Bytes;
use http::{header, HeaderValue, Response, StatusCode};
use serde::Serialize;
use std::fmt;

/// Result type alias for mortar operations
pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// HTTP-facing error rendered as a JSON status envelope.
///
/// Middleware rejections (CSRF failures, missing sessions, unreadable bodies)
/// are all expressed as an `ApiError` and turned into a response with
/// [`ApiError::into_response`]. The envelope never carries secrets; the
/// optional `error` detail is the display form of the underlying failure.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code
    pub status: StatusCode,
    /// Human-readable message
    pub message: String,
    /// Optional error detail
    pub error: Option<String>,
}

/// JSON body of an [`ApiError`] response
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct StatusBody {
    /// Numeric HTTP status
    pub code: u16,
    /// Human-readable message
    pub message: String,
    /// Optional payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Optional error detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error: None,
        }
    }

    /// Create a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Create a 401 Unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Create a 403 Forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// Create a 404 Not Found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Create a 408 Request Timeout error
    pub fn request_timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::REQUEST_TIMEOUT, message)
    }

    /// Create a 409 Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Create a 422 Unprocessable Entity error
    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    /// Create a 429 Too Many Requests error
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    /// Create a 500 Internal Server Error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Create a 503 Service Unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// Attach the display form of an underlying error
    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// The JSON envelope for this error
    pub fn body(&self) -> StatusBody {
        StatusBody {
            code: self.status.as_u16(),
            message: self.message.clone(),
            data: None,
            error: self.error.clone(),
        }
    }

    /// Render this error as a JSON response with any body type built from bytes.
    pub fn into_response<B>(self) -> Response<B>
    where
        B: From<Bytes>,
    {
        // Serializing a struct of strings and integers cannot fail
        let json = serde_json::to_vec(&self.body()).unwrap_or_default();

        let mut response = Response::new(B::from(Bytes::from(json)));
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(error) => write!(f, "{} ({}): {}", self.message, self.status, error),
            None => write!(f, "{} ({})", self.message, self.status),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::bad_request("Invalid JSON").with_error(err)
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal("I/O error").with_error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(response: Response<Bytes>) -> StatusBody {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[test]
    fn test_forbidden_envelope() {
        let response: Response<Bytes> = ApiError::forbidden("CSRF protection error: Missing CSRF token")
            .into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = decode(response);
        assert_eq!(body.code, 403);
        assert_eq!(body.message, "CSRF protection error: Missing CSRF token");
        assert!(body.error.is_none());
    }

    #[test]
    fn test_error_detail_is_serialized() {
        let response: Response<Bytes> = ApiError::unauthorized("Authentication required.")
            .with_error("no user in session")
            .into_response();

        let raw: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(raw["code"], 401);
        assert_eq!(raw["error"], "no user in session");
        assert!(raw.get("data").is_none());
    }

    #[test]
    fn test_display() {
        let err = ApiError::conflict("already exists");
        assert_eq!(err.to_string(), "already exists (409 Conflict)");

        let err = err.with_error("duplicate key");
        assert_eq!(err.to_string(), "already exists (409 Conflict): duplicate key");
    }

    #[test]
    fn test_io_error_maps_to_500() {
        let err: ApiError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error.as_deref(), Some("disk"));
    }
}
