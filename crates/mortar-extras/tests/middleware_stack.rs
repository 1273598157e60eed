//! Full middleware stack over a shared in-memory session store

use bytes::Bytes;
use http::{header, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use mortar_core::{CaptureWriter, JsonLogger, StatusBody};
use mortar_extras::csrf::{issue_token, CsrfLayer, CSRF_HEADER};
use mortar_extras::logging::IncomingLoggingLayer;
use mortar_extras::session::{create_session, current_user_id, RequireSessionLayer, SessionConfig};
use std::convert::Infallible;
use std::time::Duration;
use tower::{service_fn, Service, ServiceBuilder, ServiceExt};
use tower_sessions::{MemoryStore, Session};

const USER: &str = "6f1c2d4e-8a9b-4c3d-9e2f-1a2b3c4d5e6f";

async fn app(req: Request<Full<Bytes>>) -> Result<Response<Full<Bytes>>, Infallible> {
    let session = req
        .extensions()
        .get::<Session>()
        .cloned()
        .expect("session layer installed");

    let body = match (req.method(), req.uri().path()) {
        (&Method::GET, "/login") => {
            create_session(&session, USER).await.unwrap();
            issue_token(&session).await.unwrap()
        }
        (&Method::POST, "/transfer") => "transferred".to_string(),
        _ => "not found".to_string(),
    };

    Ok(Response::new(Full::new(Bytes::from(body))))
}

async fn whoami(req: Request<Full<Bytes>>) -> Result<Response<Full<Bytes>>, Infallible> {
    let id = current_user_id(req.extensions()).unwrap();
    Ok(Response::new(Full::new(Bytes::from(id.to_string()))))
}

fn sessions(store: &MemoryStore) -> tower_sessions::SessionManagerLayer<MemoryStore> {
    SessionConfig::default()
        .secure(false)
        .max_age(Duration::from_secs(3600))
        .layer(store.clone())
}

async fn call<S>(service: &S, req: Request<Full<Bytes>>) -> Response<Full<Bytes>>
where
    S: Service<Request<Full<Bytes>>, Response = Response<Full<Bytes>>, Error = Infallible>
        + Clone,
{
    service.clone().oneshot(req).await.unwrap()
}

async fn text(response: Response<Full<Bytes>>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_login_then_protected_requests() {
    let store = MemoryStore::default();
    let capture = CaptureWriter::new();

    let public = ServiceBuilder::new()
        .layer(sessions(&store))
        .layer(IncomingLoggingLayer::new().with_logger(JsonLogger::new(capture.clone())))
        .layer(CsrfLayer::new(Duration::from_secs(300)))
        .service(service_fn(app));

    let protected = ServiceBuilder::new()
        .layer(sessions(&store))
        .layer(RequireSessionLayer::new())
        .service(service_fn(whoami));

    // Login establishes the session and hands out a token
    let res = call(
        &public,
        Request::get("/login").body(Full::default()).unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-trace-id"));

    let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("auth_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age="));
    assert!(!set_cookie.contains("Secure"));
    let cookie = set_cookie.split(';').next().unwrap().to_string();
    let token = text(res).await;

    // Token plus cookie passes
    let res = call(
        &public,
        Request::post("/transfer")
            .header(header::COOKIE, &cookie)
            .header(CSRF_HEADER, &token)
            .body(Full::default())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(text(res).await, "transferred");

    // Cookie without token is rejected
    let res = call(
        &public,
        Request::post("/transfer")
            .header(header::COOKIE, &cookie)
            .body(Full::default())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: StatusBody = serde_json::from_str(&text(res).await).unwrap();
    assert_eq!(body.message, "CSRF protection error: Missing CSRF token");

    // Token from another session has no secret to check against
    let res = call(
        &public,
        Request::post("/transfer")
            .header(CSRF_HEADER, &token)
            .body(Full::default())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: StatusBody = serde_json::from_str(&text(res).await).unwrap();
    assert_eq!(body.message, "CSRF protection error: Missing CSRF secret");

    // The session user is visible behind RequireSessionLayer
    let res = call(
        &protected,
        Request::get("/me")
            .header(header::COOKIE, &cookie)
            .body(Full::default())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(text(res).await, USER);

    let res = call(&protected, Request::get("/me").body(Full::default()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // One log entry per public request, levelled by status
    let levels: Vec<String> = capture
        .entries()
        .iter()
        .map(|entry| entry["level"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(levels, ["INFO", "INFO", "WARN", "WARN"]);
}
