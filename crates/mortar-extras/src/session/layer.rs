use super::USER_KEY;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::{Request, Response};
use mortar_core::ApiError;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tower_sessions::Session;

const AUTHENTICATION_REQUIRED: &str = "Authentication required.";

/// ID of the logged-in user, inserted into request extensions by
/// [`RequireSessionLayer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser(pub String);

impl SessionUser {
    /// Wrap a user ID
    pub fn new(user_id: impl Into<String>) -> Self {
        Self(user_id.into())
    }

    /// The user ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Layer rejecting requests whose session has no logged-in user with
/// `401 Authentication required.`
///
/// Must sit inside a `tower_sessions::SessionManagerLayer`.
#[derive(Debug, Clone, Default)]
pub struct RequireSessionLayer;

impl RequireSessionLayer {
    /// Create the layer
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequireSessionLayer {
    type Service = RequireSessionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireSessionService { inner }
    }
}

/// Service produced by [`RequireSessionLayer`]
#[derive(Debug, Clone)]
pub struct RequireSessionService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequireSessionService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: From<Bytes> + Send + 'static,
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

        Box::pin(async move {
            let Some(session) = req.extensions().get::<Session>().cloned() else {
                tracing::warn!("Session check on a request without a session");
                return Ok(ApiError::unauthorized(AUTHENTICATION_REQUIRED).into_response());
            };

            let user_id = match session.get::<String>(USER_KEY).await {
                Ok(Some(user_id)) => user_id,
                Ok(None) => {
                    return Ok(ApiError::unauthorized(AUTHENTICATION_REQUIRED).into_response())
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to load session user");
                    return Ok(ApiError::unauthorized(AUTHENTICATION_REQUIRED).into_response());
                }
            };

            req.extensions_mut().insert(SessionUser(user_id));
            inner.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{create_session, current_user_id};
    use http::StatusCode;
    use http_body_util::{BodyExt, Full};
    use mortar_core::StatusBody;
    use std::convert::Infallible;
    use std::sync::Arc;
    use tower::{service_fn, ServiceExt};
    use tower_sessions::MemoryStore;
    use uuid::Uuid;

    /// Responds with the user ID the layer attached
    async fn whoami(req: Request<Full<Bytes>>) -> Result<Response<Full<Bytes>>, Infallible> {
        let id = current_user_id(req.extensions())
            .map(|id| id.to_string())
            .unwrap_or_default();
        Ok(Response::new(Full::new(Bytes::from(id))))
    }

    async fn send(req: Request<Full<Bytes>>) -> Response<Full<Bytes>> {
        RequireSessionLayer::new()
            .layer(service_fn(whoami))
            .oneshot(req)
            .await
            .unwrap()
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_logged_in_user_reaches_handler() {
        let session = session();
        let user = Uuid::new_v4();
        create_session(&session, &user.to_string()).await.unwrap();

        let req = Request::builder()
            .extension(session)
            .body(Full::default())
            .unwrap();
        let res = send(req).await;

        assert_eq!(res.status(), StatusCode::OK);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from(user.to_string()));
    }

    #[tokio::test]
    async fn test_anonymous_session_is_rejected() {
        let req = Request::builder()
            .extension(session())
            .body(Full::default())
            .unwrap();
        let res = send(req).await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body: StatusBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.code, 401);
        assert_eq!(body.message, "Authentication required.");
    }

    #[tokio::test]
    async fn test_missing_session_layer_is_rejected() {
        let req = Request::builder().body(Full::default()).unwrap();
        let res = send(req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
