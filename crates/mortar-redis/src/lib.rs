//! # Mortar Redis
//!
//! Opens a multiplexed Redis connection and confirms the server answers
//! `PING` before handing it out.
//!
//! ```rust,no_run
//! use mortar_redis::{RedisClient, RedisConfig};
//!
//! # async fn run() -> Result<(), mortar_redis::RedisError> {
//! let client = RedisClient::connect(RedisConfig {
//!     host: "localhost".into(),
//!     port: 6379,
//!     ..Default::default()
//! })
//! .await?;
//!
//! let mut conn = client.connection();
//! let _: () = redis::cmd("SET").arg("greeting").arg("hello").query_async(&mut conn).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod client;
mod config;

pub use client::{RedisClient, RedisError};
pub use config::{RedisConfig, RedisPoolConfig};
