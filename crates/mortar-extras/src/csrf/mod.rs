//! Session-backed CSRF protection
//!
//! Each session holds a random secret under [`CSRF_SECRET_KEY`]. Pages embed
//! a token derived from it ([`issue_token`]) and state-changing requests send
//! the token back in the `X-CSRF-Token` header or a `csrf_token` form field.
//! [`CsrfLayer`] verifies it against the session's secret.
//!
//! The layer reads the session from request extensions, so it must sit
//! inside a `tower_sessions::SessionManagerLayer`.
//!
//! # Example
//!
//! ```rust,ignore
//! use mortar_extras::csrf::{issue_token, CsrfLayer};
//! use std::time::Duration;
//! use tower::ServiceBuilder;
//! use tower_sessions::{MemoryStore, SessionManagerLayer};
//!
//! let service = ServiceBuilder::new()
//!     .layer(SessionManagerLayer::new(MemoryStore::default()))
//!     .layer(CsrfLayer::new(Duration::from_secs(3600)))
//!     .service(app);
//!
//! // In a handler rendering a form:
//! let token = issue_token(&session).await?;
//! ```

mod layer;
mod session;

pub use layer::{CsrfLayer, CsrfService};
pub use session::{initialize, issue_token, CsrfSessionError};

/// Request header carrying the token
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Form field carrying the token
pub const CSRF_FORM_FIELD: &str = "csrf_token";

/// Session key holding the secret
pub const CSRF_SECRET_KEY: &str = "csrf_secret";
