use thiserror::Error;

/// Errors from session helpers
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation needs a logged-in user and the session has none
    #[error("no active session to {0}")]
    NoActiveSession(&'static str),

    /// No [`SessionUser`](super::SessionUser) in the request extensions
    #[error("user ID not found in request")]
    UserNotFound,

    /// The stored user ID is not a UUID
    #[error("invalid user ID format")]
    InvalidUserId(#[source] uuid::Error),

    /// The session store failed
    #[error("session store error: {0}")]
    Store(#[from] tower_sessions::session::Error),
}
