use super::{SessionError, SessionUser, USER_KEY};
use http::Extensions;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tower_sessions::Session;
use uuid::Uuid;

/// Log a user in by storing their ID in the session
pub async fn create_session(session: &Session, user_id: &str) -> Result<(), SessionError> {
    session.insert(USER_KEY, user_id).await?;
    Ok(())
}

/// Log the user out: drop all session data and delete it from the store.
///
/// The session manager answers with an expired cookie.
pub async fn destroy_session(session: &Session) -> Result<(), SessionError> {
    session.flush().await?;
    Ok(())
}

/// Persist the session now, extending its inactivity expiry.
pub async fn refresh_session(session: &Session) -> Result<(), SessionError> {
    if session.get::<String>(USER_KEY).await?.is_none() {
        return Err(SessionError::NoActiveSession("refresh"));
    }
    session.save().await?;
    Ok(())
}

/// Issue a new session ID, keeping only the logged-in user.
///
/// Call after privilege changes such as login to prevent session fixation.
pub async fn rotate_session_id(session: &Session) -> Result<(), SessionError> {
    let Some(user_id) = session.get::<String>(USER_KEY).await? else {
        return Err(SessionError::NoActiveSession("rotate"));
    };

    session.clear().await;
    session.insert(USER_KEY, user_id).await?;
    session.cycle_id().await?;

    tracing::debug!("Rotated session ID");
    Ok(())
}

/// Store an arbitrary serializable value in the session
pub async fn set_session_data<T: Serialize>(
    session: &Session,
    key: &str,
    value: T,
) -> Result<(), SessionError> {
    session.insert(key, value).await?;
    Ok(())
}

/// Read a value previously stored with [`set_session_data`]
pub async fn get_session_data<T: DeserializeOwned>(
    session: &Session,
    key: &str,
) -> Result<Option<T>, SessionError> {
    Ok(session.get(key).await?)
}

/// The authenticated user's ID as set by [`RequireSessionLayer`](super::RequireSessionLayer).
pub fn current_user_id(extensions: &Extensions) -> Result<Uuid, SessionError> {
    let user = extensions
        .get::<SessionUser>()
        .ok_or(SessionError::UserNotFound)?;
    Uuid::parse_str(user.as_str()).map_err(SessionError::InvalidUserId)
}
