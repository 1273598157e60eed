//! # Mortar CSRF
//!
//! Stateless CSRF tokens of the form `"<timestamp>:<signature>"`, where
//! `timestamp` is the issuance time in Unix seconds and `signature` is the
//! lowercase hex HMAC-SHA256 of that decimal timestamp keyed by a per-session
//! secret.
//!
//! Nothing is stored server-side apart from the secret, which normally lives
//! in the user's session. Tokens are deterministic for a given secret and
//! second and carry no nonce, so a token can be replayed until it expires.
//!
//! # Example
//!
//! ```rust
//! use mortar_csrf::{generate_secret, generate_token, verify_token};
//! use std::time::Duration;
//!
//! let secret = generate_secret().expect("OS random source");
//! let token = generate_token(&secret);
//!
//! assert!(verify_token(&token, &secret, Duration::from_secs(3600)).is_ok());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod token;

pub use error::CsrfError;
pub use token::{
    generate_secret, generate_token, generate_token_at, unix_now, verify_token, verify_token_at,
    SECRET_LEN,
};
