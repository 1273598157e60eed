//! Cookie sessions on top of `tower-sessions`
//!
//! The session store itself is external: any `tower_sessions::SessionStore`
//! (memory, Redis, SQL) can back the layer produced by
//! [`SessionConfig::layer`]. The authenticated user is kept under
//! [`USER_KEY`]; [`RequireSessionLayer`] rejects requests without one and
//! exposes it to handlers as a [`SessionUser`] extension.
//!
//! # Example
//!
//! ```rust,ignore
//! use mortar_extras::session::{create_session, RequireSessionLayer, SessionConfig};
//! use tower::ServiceBuilder;
//! use tower_sessions::MemoryStore;
//!
//! let sessions = SessionConfig::default()
//!     .max_age(Duration::from_secs(3600))
//!     .layer(MemoryStore::default());
//!
//! let protected = ServiceBuilder::new()
//!     .layer(sessions)
//!     .layer(RequireSessionLayer::new())
//!     .service(app);
//!
//! // On login:
//! create_session(&session, &user.id.to_string()).await?;
//! ```

mod config;
mod error;
mod helpers;
mod layer;

pub use config::SessionConfig;
pub use error::SessionError;
pub use helpers::{
    create_session, current_user_id, destroy_session, get_session_data, refresh_session,
    rotate_session_id, set_session_data,
};
pub use layer::{RequireSessionLayer, RequireSessionService, SessionUser};

/// Session key holding the authenticated user's ID
pub const USER_KEY: &str = "user_id";

/// Default session cookie name
pub const SESSION_NAME: &str = "auth_session";
