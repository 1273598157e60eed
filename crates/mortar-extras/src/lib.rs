//! # Mortar Extras
//!
//! Tower middleware built on the mortar core types. Every component is behind
//! a cargo feature:
//!
//! | feature | contents |
//! |---|---|
//! | `csrf` | [`CsrfLayer`](csrf::CsrfLayer) verifying session-bound CSRF tokens |
//! | `session` | `tower-sessions` configuration, session helpers and [`RequireSessionLayer`](session::RequireSessionLayer) |
//! | `logging` | [`IncomingLoggingLayer`](logging::IncomingLoggingLayer) with trace ID propagation |
//! | `client` | [`OutgoingLogger`](client::OutgoingLogger) wrapping `reqwest` |
//! | `full` | all of the above |
//!
//! Rejections are JSON status envelopes (see [`mortar_core::ApiError`]), so
//! services can use any response body type that can be built from `Bytes`.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

#[cfg(any(feature = "csrf", feature = "logging", feature = "client"))]
mod body;

#[cfg(feature = "csrf")]
pub mod csrf;

#[cfg(feature = "session")]
pub mod session;

#[cfg(feature = "logging")]
pub mod logging;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "csrf")]
pub use csrf::{CsrfLayer, CsrfService};

#[cfg(feature = "session")]
pub use session::{RequireSessionLayer, SessionConfig, SessionError, SessionUser};

#[cfg(feature = "logging")]
pub use logging::IncomingLoggingLayer;

#[cfg(feature = "client")]
pub use client::OutgoingLogger;
