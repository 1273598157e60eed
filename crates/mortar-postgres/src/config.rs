use crate::error::PostgresError;
use crate::retry::RetryPolicy;
use mortar_core::config::{duration_secs, from_env_prefixed};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::fmt;
use std::time::Duration;

const DEFAULT_SSL_MODE: &str = "disable";
const DEFAULT_VALIDATION_QUERY: &str = "SELECT 1";
const DEFAULT_MIN_POOL_SIZE: u32 = 2;
const DEFAULT_MAX_POOL_SIZE: u32 = 10;
const DEFAULT_MAX_IDLE_TIME: Duration = Duration::from_secs(30);
const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(90);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// PostgreSQL connection parameters.
///
/// Loadable from `POSTGRES_*` variables with [`ConnectionConfig::from_env`].
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server host
    #[serde(default)]
    pub host: String,
    /// Server port
    #[serde(default)]
    pub port: u16,
    /// Role name
    #[serde(default)]
    pub username: String,
    /// Role password
    #[serde(default)]
    pub password: String,
    /// Database name
    #[serde(default)]
    pub database: String,
    /// libpq-style sslmode (`disable`, `prefer`, `require`, `verify-ca`, ...)
    #[serde(default)]
    pub ssl_mode: String,
    /// Pool settings. `None` means all defaults.
    #[serde(default)]
    pub pool: Option<PoolConfig>,
}

/// Pool sizing, lifetimes and retry behaviour.
///
/// Durations are whole seconds when (de)serialized. Zero or empty fields are
/// replaced by defaults in [`PoolConfig::with_defaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Connections kept open when idle
    #[serde(default)]
    pub min_pool_size: u32,
    /// Upper bound on open connections
    #[serde(default)]
    pub max_pool_size: u32,
    /// Idle time after which a connection is closed
    #[serde(default, with = "duration_secs")]
    pub max_idle_time: Duration,
    /// Age after which a connection is closed
    #[serde(default, with = "duration_secs")]
    pub max_lifetime: Duration,
    /// Timeout for acquiring a connection
    #[serde(default, with = "duration_secs")]
    pub connect_timeout: Duration,
    /// Query run to validate connections
    #[serde(default)]
    pub validation_query: String,
    /// Connection attempts before giving up
    #[serde(default)]
    pub retry_attempts: u32,
    /// Fixed delay between attempts
    #[serde(default, with = "duration_secs")]
    pub retry_interval: Duration,
}

impl PoolConfig {
    /// Replace zero and empty fields with defaults, keeping everything set.
    pub fn with_defaults(mut self) -> Self {
        if self.validation_query.is_empty() {
            self.validation_query = DEFAULT_VALIDATION_QUERY.to_string();
        }
        if self.min_pool_size == 0 {
            self.min_pool_size = DEFAULT_MIN_POOL_SIZE;
        }
        if self.max_pool_size == 0 {
            self.max_pool_size = DEFAULT_MAX_POOL_SIZE;
        }
        if self.max_idle_time.is_zero() {
            self.max_idle_time = DEFAULT_MAX_IDLE_TIME;
        }
        if self.max_lifetime.is_zero() {
            self.max_lifetime = DEFAULT_MAX_LIFETIME;
        }
        if self.connect_timeout.is_zero() {
            self.connect_timeout = DEFAULT_CONNECT_TIMEOUT;
        }
        if self.retry_attempts == 0 {
            self.retry_attempts = DEFAULT_RETRY_ATTEMPTS;
        }
        if self.retry_interval.is_zero() {
            self.retry_interval = DEFAULT_RETRY_INTERVAL;
        }
        self
    }

    /// Retry settings for the connect loop
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            validation_query: self.validation_query.clone(),
            attempts: self.retry_attempts,
            interval: self.retry_interval,
        }
    }

    /// Pool options without the validation hook
    pub(crate) fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .min_connections(self.min_pool_size)
            .max_connections(self.max_pool_size)
            .idle_timeout(self.max_idle_time)
            .max_lifetime(self.max_lifetime)
            .acquire_timeout(self.connect_timeout)
    }
}

impl ConnectionConfig {
    /// Load `POSTGRES_HOST`, `POSTGRES_PORT`, ... and `POSTGRES_POOL_*`.
    pub fn from_env() -> Result<Self, PostgresError> {
        Self::from_env_prefixed("POSTGRES")
    }

    /// Load `<PREFIX>_*` connection variables and `<PREFIX>_POOL_*` pool variables.
    pub fn from_env_prefixed(prefix: &str) -> Result<Self, PostgresError> {
        #[derive(Deserialize)]
        struct Flat {
            #[serde(default)]
            host: String,
            #[serde(default)]
            port: u16,
            #[serde(default)]
            username: String,
            #[serde(default)]
            password: String,
            #[serde(default)]
            database: String,
            #[serde(default)]
            ssl_mode: String,
        }

        let flat: Flat = from_env_prefixed(prefix)?;
        let pool: PoolConfig = from_env_prefixed(&format!("{prefix}_POOL"))?;

        Ok(Self {
            host: flat.host,
            port: flat.port,
            username: flat.username,
            password: flat.password,
            database: flat.database,
            ssl_mode: flat.ssl_mode,
            pool: Some(pool),
        })
    }

    /// Fill unset fields with defaults.
    ///
    /// A missing pool section is replaced by an all-default one and a warning
    /// is logged.
    pub fn with_defaults(mut self) -> Self {
        let pool = match self.pool.take() {
            Some(pool) => pool,
            None => {
                tracing::warn!("ConnectionPool is nil, using default settings");
                PoolConfig::default()
            }
        };
        self.pool = Some(pool.with_defaults());

        if self.ssl_mode.is_empty() {
            self.ssl_mode = DEFAULT_SSL_MODE.to_string();
        }
        self
    }

    /// Pool settings, defaulted if absent
    pub fn pool_config(&self) -> PoolConfig {
        self.pool.clone().unwrap_or_default().with_defaults()
    }

    /// sqlx connect options for these parameters
    pub fn connect_options(&self) -> Result<PgConnectOptions, PostgresError> {
        let ssl_mode = if self.ssl_mode.is_empty() {
            DEFAULT_SSL_MODE
        } else {
            self.ssl_mode.as_str()
        };
        let ssl_mode: PgSslMode = ssl_mode
            .parse()
            .map_err(|_| PostgresError::InvalidSslMode(self.ssl_mode.clone()))?;

        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .ssl_mode(ssl_mode);

        if self.port != 0 {
            options = options.port(self.port);
        }
        if !self.password.is_empty() {
            options = options.password(&self.password);
        }
        if !self.database.is_empty() {
            options = options.database(&self.database);
        }
        Ok(options)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode)
            .field("pool", &self.pool)
            .finish()
    }
}
