//! Configuration loading from `.env` files and environment variables.
//!
//! Connection settings for the backend crates derive `Deserialize`, so an
//! application can load them with a prefix:
//!
//! ```ignore
//! use mortar_core::config::{from_env_prefixed, load_dotenv};
//! use mortar_postgres::ConnectionConfig;
//!
//! load_dotenv();
//!
//! // POSTGRES_HOST, POSTGRES_PORT, POSTGRES_USER, ...
//! let config: ConnectionConfig = from_env_prefixed("POSTGRES")?;
//! ```

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Environment variable naming the deployment profile
pub const ENVIRONMENT_VAR: &str = "MORTAR_ENV";

/// Error type for configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable deserialization failed.
    #[error("Configuration error: {0}")]
    Env(#[from] envy::Error),
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
}

/// Deployment profile, detected from `MORTAR_ENV`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Local development
    Development,
    /// Production deployment
    Production,
    /// Any other profile name
    Custom(String),
}

impl Environment {
    /// Detect the current environment from `MORTAR_ENV`.
    ///
    /// - `Production` for "production" or "prod"
    /// - `Development` for "development", "dev", or when unset
    /// - `Custom(name)` for anything else
    pub fn current() -> Self {
        match std::env::var(ENVIRONMENT_VAR).as_deref() {
            Ok("production") | Ok("prod") => Self::Production,
            Ok("development") | Ok("dev") => Self::Development,
            Ok(other) => Self::Custom(other.to_string()),
            Err(_) => Self::Development,
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Profile name
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }
}

/// Load environment variables from a `.env` file in the current directory.
///
/// A missing file is not an error, and existing variables are not overridden.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Load environment variables from a specific file path.
pub fn load_dotenv_from<P: AsRef<std::path::Path>>(path: P) {
    let _ = dotenvy::from_path(path);
}

/// Deserialize `T` from environment variables named `<PREFIX>_<FIELD>`.
///
/// Field names are matched in SCREAMING_SNAKE_CASE, so a `retry_attempts`
/// field with prefix `POSTGRES_POOL` reads `POSTGRES_POOL_RETRY_ATTEMPTS`.
pub fn from_env_prefixed<T>(prefix: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    envy::prefixed(format!("{}_", prefix))
        .from_env::<T>()
        .map_err(ConfigError::from)
}

/// Read a required environment variable.
pub fn require_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

/// Serde adapter storing a `Duration` as whole seconds.
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct Settings {
///     #[serde(default, with = "mortar_core::config::duration_secs")]
///     idle_timeout: Duration,
/// }
/// ```
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize as an integer number of seconds
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    /// Deserialize from an integer number of seconds
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
