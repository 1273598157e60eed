use super::{CSRF_FORM_FIELD, CSRF_HEADER, CSRF_SECRET_KEY};
use crate::body::collect_body;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::{header, HeaderMap, Method, Request, Response};
use http_body_util::Limited;
use mortar_core::ApiError;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{BoxError, Layer, Service};
use tower_sessions::Session;

/// Largest form body buffered while looking for a token
const FORM_BODY_LIMIT: usize = 1024 * 1024;

const MISSING_SECRET: &str = "CSRF protection error: Missing CSRF secret";
const MISSING_TOKEN: &str = "CSRF protection error: Missing CSRF token";
const INVALID_TOKEN: &str = "CSRF protection error: Invalid CSRF token";

/// Layer verifying CSRF tokens on state-changing requests.
///
/// `GET`, `HEAD` and `OPTIONS` pass straight through. Other methods must
/// carry a token no older than `max_age`, signed with the secret stored in
/// the request's session; otherwise the request is answered with `403`.
#[derive(Debug, Clone)]
pub struct CsrfLayer {
    max_age: Duration,
}

impl CsrfLayer {
    /// Accept tokens up to `max_age` old
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }
}

impl<S> Layer<S> for CsrfLayer {
    type Service = CsrfService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CsrfService {
            inner,
            max_age: self.max_age,
        }
    }
}

/// Service produced by [`CsrfLayer`]
#[derive(Debug, Clone)]
pub struct CsrfService<S> {
    inner: S,
    max_age: Duration,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CsrfService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: http_body::Body + From<Bytes> + Send + 'static,
    ReqBody::Data: Send,
    ReqBody::Error: Into<BoxError>,
    ResBody: From<Bytes> + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let max_age = self.max_age;

        Box::pin(async move {
            if matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
                return inner.call(req).await;
            }

            match check(req, max_age).await {
                Ok(req) => inner.call(req).await,
                Err(rejection) => Ok(rejection.into_response()),
            }
        })
    }
}

async fn check<B>(req: Request<B>, max_age: Duration) -> Result<Request<B>, ApiError>
where
    B: http_body::Body + From<Bytes>,
    B::Error: Into<BoxError>,
{
    let secret = match req.extensions().get::<Session>().cloned() {
        Some(session) => session
            .get::<String>(CSRF_SECRET_KEY)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "Failed to load CSRF secret from session");
                ApiError::internal("CSRF protection error: Session unavailable")
            })?,
        None => {
            tracing::warn!("CSRF check on a request without a session");
            None
        }
    };
    let Some(secret) = secret else {
        return Err(ApiError::forbidden(MISSING_SECRET));
    };

    let (req, token) = extract_token(req).await?;
    let Some(token) = token else {
        return Err(ApiError::forbidden(MISSING_TOKEN));
    };

    if let Err(err) = mortar_csrf::verify_token(&token, &secret, max_age) {
        tracing::warn!(
            error = %err,
            method = %req.method(),
            path = %req.uri().path(),
            "CSRF token rejected"
        );
        return Err(ApiError::forbidden(INVALID_TOKEN).with_error(err));
    }

    Ok(req)
}

/// Token from the header, or from a urlencoded form body which is restored.
async fn extract_token<B>(req: Request<B>) -> Result<(Request<B>, Option<String>), ApiError>
where
    B: http_body::Body + From<Bytes>,
    B::Error: Into<BoxError>,
{
    let header_token = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned);

    if header_token.is_some() || !is_form(req.headers()) {
        return Ok((req, header_token));
    }

    let (parts, body) = req.into_parts();
    let bytes = collect_body(Limited::new(body, FORM_BODY_LIMIT))
        .await
        .map_err(|err| ApiError::bad_request("Failed to read request body").with_error(err))?;

    let token = form_field(&bytes, CSRF_FORM_FIELD);
    Ok((Request::from_parts(parts, B::from(bytes)), token))
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

fn form_field(bytes: &[u8], name: &str) -> Option<String> {
    serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes)
        .ok()?
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
