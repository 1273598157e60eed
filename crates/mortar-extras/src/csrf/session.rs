use super::CSRF_SECRET_KEY;
use mortar_csrf::{generate_secret, generate_token, CsrfError};
use thiserror::Error;
use tower_sessions::Session;

/// Errors from preparing a session for CSRF protection
#[derive(Debug, Error)]
pub enum CsrfSessionError {
    /// Secret generation failed
    #[error(transparent)]
    Csrf(#[from] CsrfError),

    /// The session store failed
    #[error("session store error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Return the session's CSRF secret, creating and storing one if absent.
pub async fn initialize(session: &Session) -> Result<String, CsrfSessionError> {
    if let Some(secret) = session.get::<String>(CSRF_SECRET_KEY).await? {
        return Ok(secret);
    }

    let secret = generate_secret()?;
    session.insert(CSRF_SECRET_KEY, &secret).await?;
    tracing::debug!("Stored new CSRF secret in session");

    Ok(secret)
}

/// Issue a fresh token for the session, initializing its secret if needed.
pub async fn issue_token(session: &Session) -> Result<String, CsrfSessionError> {
    let secret = initialize(session).await?;
    Ok(generate_token(&secret))
}
