//! # Mortar
//!
//! Building blocks for HTTP services.
//!
//! - Stateless CSRF tokens: HMAC-SHA256 signed timestamps bound to a
//!   per-session secret
//! - A PostgreSQL pool connector that retries until the pool passes a
//!   validation query
//! - A Redis client connector with connect and response timeouts
//! - A structured JSON logger and `tracing` setup
//! - Tower middleware for session-backed CSRF checks, cookie sessions,
//!   request logging with trace IDs, and an outgoing `reqwest` logger
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mortar::prelude::*;
//! use std::time::Duration;
//!
//! let secret = generate_secret()?;
//! let token = generate_token(&secret);
//! verify_token(&token, &secret, Duration::from_secs(3600))?;
//! ```
//!
//! ## Optional Features
//!
//! - `postgres` - [`Database`](postgres::Database) connector on `sqlx`
//! - `redis` - [`RedisClient`](redis::RedisClient) connector
//! - `csrf` - `CsrfLayer` and session secret helpers
//! - `session` - cookie session configuration and `RequireSessionLayer`
//! - `logging` - `IncomingLoggingLayer`
//! - `client` - `OutgoingLogger`
//! - `middleware` - csrf, session and logging
//! - `full` - everything
//!
//! ```toml
//! [dependencies]
//! mortar = { version = "0.1", features = ["postgres", "middleware"] }
//! ```

// Re-export core functionality
pub use mortar_core::*;

/// CSRF token generation and verification
pub mod token {
    pub use mortar_csrf::*;
}

#[cfg(feature = "postgres")]
pub use mortar_postgres as postgres;

#[cfg(feature = "redis")]
pub use mortar_redis as redis;

#[cfg(feature = "csrf")]
pub use mortar_extras::csrf;
#[cfg(feature = "csrf")]
pub use mortar_extras::{CsrfLayer, CsrfService};

#[cfg(feature = "session")]
pub use mortar_extras::session;
#[cfg(feature = "session")]
pub use mortar_extras::{RequireSessionLayer, SessionConfig, SessionError, SessionUser};

#[cfg(feature = "logging")]
pub use mortar_extras::logging;
#[cfg(feature = "logging")]
pub use mortar_extras::IncomingLoggingLayer;

#[cfg(feature = "client")]
pub use mortar_extras::client;
#[cfg(feature = "client")]
pub use mortar_extras::OutgoingLogger;

/// Prelude module - import everything you need with `use mortar::prelude::*`
pub mod prelude {
    pub use mortar_core::{
        ApiError, Environment, JsonLogger, Level, LogSink, Result, StatusBody, TraceId,
    };
    pub use mortar_csrf::{generate_secret, generate_token, verify_token, CsrfError};

    #[cfg(feature = "postgres")]
    pub use mortar_postgres::{ConnectionConfig, Database, PoolConfig, PostgresError};

    #[cfg(feature = "redis")]
    pub use mortar_redis::{RedisClient, RedisConfig, RedisError};

    #[cfg(feature = "csrf")]
    pub use mortar_extras::csrf::{issue_token, CsrfLayer};

    #[cfg(feature = "session")]
    pub use mortar_extras::session::{
        create_session, current_user_id, destroy_session, RequireSessionLayer, SessionConfig,
        SessionUser,
    };

    #[cfg(feature = "logging")]
    pub use mortar_extras::logging::IncomingLoggingLayer;

    #[cfg(feature = "client")]
    pub use mortar_extras::client::OutgoingLogger;

    // Common external crates
    pub use serde_json::json;
    pub use tracing::{debug, error, info, instrument, trace, warn};
}
