//! # Mortar Core
//!
//! Foundational types shared by the mortar crates:
//!
//! - [`ApiError`] - JSON status envelope used by every middleware rejection
//! - [`JsonLogger`] - explicitly constructed structured JSON logger
//! - [`TraceId`] - request trace identifier propagated through `X-Trace-ID`
//! - [`config`] - `.env` loading and prefixed environment deserialization
//! - [`telemetry`] - `tracing-subscriber` initialization
//!
//! This crate is not meant to be used directly. Use `mortar` instead.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
mod error;
pub mod log;
pub mod telemetry;
mod trace;

pub use config::{from_env_prefixed, load_dotenv, ConfigError, Environment};
pub use error::{ApiError, Result, StatusBody};
pub use log::{log_by_status, JsonLogger, Level, LogSink};
pub use trace::{TraceId, TRACE_ID_HEADER};

#[cfg(any(test, feature = "test-utils"))]
pub use log::CaptureWriter;
