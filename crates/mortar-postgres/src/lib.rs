//! # Mortar Postgres
//!
//! Establishes a PostgreSQL connection pool that survives a database which is
//! still starting up. Connecting opens a pool, pings it and runs a validation
//! query, retrying the whole sequence at a fixed interval. Every connection
//! checked out of the resulting pool is validated again before use.
//!
//! Unset (zero or empty) pool settings are filled with defaults:
//!
//! | setting | default |
//! |---|---|
//! | `ssl_mode` | `disable` |
//! | `validation_query` | `SELECT 1` |
//! | `min_pool_size` | 2 |
//! | `max_pool_size` | 10 |
//! | `max_idle_time` | 30s |
//! | `max_lifetime` | 90s |
//! | `connect_timeout` | 5s |
//! | `retry_attempts` | 3 |
//! | `retry_interval` | 3s |
//!
//! # Example
//!
//! ```rust,no_run
//! use mortar_postgres::{ConnectionConfig, Database};
//!
//! # async fn run() -> Result<(), mortar_postgres::PostgresError> {
//! let config = ConnectionConfig {
//!     host: "localhost".into(),
//!     port: 5432,
//!     username: "app".into(),
//!     password: "secret".into(),
//!     database: "app".into(),
//!     ..Default::default()
//! };
//!
//! let db = Database::connect(config).await?;
//! let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(db.pool()).await.unwrap();
//! db.close().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod config;
mod database;
mod error;
mod retry;

pub use config::{ConnectionConfig, PoolConfig};
pub use database::{Database, SqlxConnector};
pub use error::PostgresError;
pub use retry::{retry_connection, PoolConnector, RetryPolicy};

/// Re-export of the underlying pool type
pub use sqlx::PgPool;
