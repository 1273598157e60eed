use mortar_core::ConfigError;
use thiserror::Error;

/// Errors returned while establishing the database pool
#[derive(Debug, Error)]
pub enum PostgresError {
    /// `ssl_mode` is not a mode PostgreSQL understands
    #[error("invalid sslmode '{0}'")]
    InvalidSslMode(String),

    /// Every connection attempt failed. `source` is the last failure.
    #[error("failed to connect to database after {attempts} attempts: {source}")]
    ConnectionExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Error from the final attempt
        #[source]
        source: sqlx::Error,
    },

    /// Loading settings from the environment failed
    #[error(transparent)]
    Config(#[from] ConfigError),
}
