use std::num::ParseIntError;
use thiserror::Error;

/// Token generation and verification failures.
///
/// Verification reports the first failing check, in this order: format,
/// timestamp, expiry, signature.
#[derive(Debug, Error)]
pub enum CsrfError {
    /// The token is not exactly two `:`-separated parts
    #[error("invalid CSRF token format")]
    InvalidFormat,

    /// The timestamp part is not a base-10 integer
    #[error("invalid timestamp in CSRF token: {0}")]
    InvalidTimestamp(#[from] ParseIntError),

    /// The token is older than the allowed age
    #[error("CSRF token has expired")]
    ExpiredToken,

    /// The signature does not match the secret
    #[error("CSRF token signature is invalid")]
    InvalidSignature,

    /// The operating system random source failed
    #[error("failed to generate random bytes: {0}")]
    RandomSource(#[source] rand::Error),
}
