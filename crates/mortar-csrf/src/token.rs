use crate::error::CsrfError;
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Number of random bytes in a secret (hex-encoded to twice as many chars)
pub const SECRET_LEN: usize = 32;

/// Current time in Unix seconds
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn sign(secret: &str, timestamp: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take a key of any size");
    mac.update(timestamp.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Generate a token for the current time.
pub fn generate_token(secret: &str) -> String {
    generate_token_at(secret, unix_now())
}

/// Generate a token stamped with `timestamp` (Unix seconds).
pub fn generate_token_at(secret: &str, timestamp: i64) -> String {
    let timestamp = timestamp.to_string();
    let signature = sign(secret, &timestamp);
    format!("{timestamp}:{signature}")
}

/// Generate a new secret: [`SECRET_LEN`] bytes from the OS CSPRNG, hex-encoded.
///
/// A failing random source is reported, never replaced with a weaker one.
pub fn generate_secret() -> Result<String, CsrfError> {
    let mut bytes = [0u8; SECRET_LEN];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(CsrfError::RandomSource)?;
    Ok(hex::encode(bytes))
}

/// Verify a token against `secret` at the current time.
pub fn verify_token(token: &str, secret: &str, max_age: Duration) -> Result<(), CsrfError> {
    verify(token, secret, max_age, SystemTime::now())
}

/// Verify a token against `secret` as of `now` (Unix seconds).
///
/// Tokens stamped in the future have a negative age and pass the expiry
/// check. The signature covers the canonical decimal form of the timestamp,
/// so `+T` or `0T` only verify with the signature of `T`. It is compared in
/// constant time.
pub fn verify_token_at(
    token: &str,
    secret: &str,
    max_age: Duration,
    now: i64,
) -> Result<(), CsrfError> {
    verify(token, secret, max_age, system_time(now).unwrap_or(UNIX_EPOCH))
}

fn verify(token: &str, secret: &str, max_age: Duration, now: SystemTime) -> Result<(), CsrfError> {
    let mut parts = token.split(':');
    let (timestamp, signature) = match (parts.next(), parts.next(), parts.next()) {
        (Some(timestamp), Some(signature), None) => (timestamp, signature),
        _ => return Err(CsrfError::InvalidFormat),
    };

    let issued_at: i64 = timestamp.parse()?;

    let expired = match system_time(issued_at) {
        Some(issued) => now
            .duration_since(issued)
            .map(|age| age > max_age)
            .unwrap_or(false),
        None => issued_at < 0,
    };
    if expired {
        return Err(CsrfError::ExpiredToken);
    }

    let expected = sign(secret, &issued_at.to_string());
    if bool::from(signature.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(CsrfError::InvalidSignature)
    }
}

/// `UNIX_EPOCH` offset by `secs`, if representable
fn system_time(secs: i64) -> Option<SystemTime> {
    let offset = Duration::from_secs(secs.unsigned_abs());
    if secs >= 0 {
        UNIX_EPOCH.checked_add(offset)
    } else {
        UNIX_EPOCH.checked_sub(offset)
    }
}
