use mortar_core::config::{duration_secs, from_env_prefixed, ConfigError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 6379;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);

/// Redis connection parameters
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Server host, `localhost` when empty
    #[serde(default)]
    pub host: String,
    /// Server port, 6379 when zero
    #[serde(default)]
    pub port: u16,
    /// AUTH password, none when empty
    #[serde(default)]
    pub password: String,
    /// Logical database index
    #[serde(default)]
    pub database: i64,
    /// Timeouts and retries. `None` means all defaults.
    #[serde(default)]
    pub pool: Option<RedisPoolConfig>,
}

/// Connection timeouts and health-check retries.
///
/// Zero fields are replaced by defaults in [`RedisPoolConfig::with_defaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisPoolConfig {
    /// Time allowed to establish the connection (default 5s)
    #[serde(default, with = "duration_secs")]
    pub connect_timeout: Duration,
    /// Time allowed for the server to answer `PING` (default 3s)
    #[serde(default, with = "duration_secs")]
    pub response_timeout: Duration,
    /// Extra `PING` attempts after the first fails
    #[serde(default)]
    pub max_retries: u32,
}

impl RedisPoolConfig {
    /// Replace zero timeouts with defaults
    pub fn with_defaults(mut self) -> Self {
        if self.connect_timeout.is_zero() {
            self.connect_timeout = DEFAULT_CONNECT_TIMEOUT;
        }
        if self.response_timeout.is_zero() {
            self.response_timeout = DEFAULT_RESPONSE_TIMEOUT;
        }
        self
    }
}

impl RedisConfig {
    /// Load `REDIS_*` and `REDIS_POOL_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_prefixed("REDIS")
    }

    /// Load `<PREFIX>_*` connection variables and `<PREFIX>_POOL_*` settings
    pub fn from_env_prefixed(prefix: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct Flat {
            #[serde(default)]
            host: String,
            #[serde(default)]
            port: u16,
            #[serde(default)]
            password: String,
            #[serde(default)]
            database: i64,
        }

        let flat: Flat = from_env_prefixed(prefix)?;
        let pool: RedisPoolConfig = from_env_prefixed(&format!("{prefix}_POOL"))?;

        Ok(Self {
            host: flat.host,
            port: flat.port,
            password: flat.password,
            database: flat.database,
            pool: Some(pool),
        })
    }

    /// Fill empty host, zero port and missing pool settings with defaults
    pub fn with_defaults(mut self) -> Self {
        if self.host.is_empty() {
            self.host = DEFAULT_HOST.to_string();
        }
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
        self.pool = Some(self.pool.take().unwrap_or_default().with_defaults());
        self
    }

    /// Pool settings, defaulted if absent
    pub fn pool_config(&self) -> RedisPoolConfig {
        self.pool.clone().unwrap_or_default().with_defaults()
    }

    /// `host:port` of the server
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"***")
            .field("database", &self.database)
            .field("pool", &self.pool)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = RedisConfig::default().with_defaults();

        assert_eq!(config.address(), "localhost:6379");
        assert_eq!(config.database, 0);
        assert_eq!(
            config.pool,
            Some(RedisPoolConfig {
                connect_timeout: Duration::from_secs(5),
                response_timeout: Duration::from_secs(3),
                max_retries: 0,
            })
        );
    }

    #[test]
    fn test_set_fields_are_kept() {
        let config = RedisConfig {
            host: "cache.internal".to_string(),
            port: 6380,
            database: 4,
            pool: Some(RedisPoolConfig {
                connect_timeout: Duration::from_secs(1),
                max_retries: 2,
                ..Default::default()
            }),
            ..Default::default()
        }
        .with_defaults();

        let pool = config.pool_config();
        assert_eq!(config.address(), "cache.internal:6380");
        assert_eq!(pool.connect_timeout, Duration::from_secs(1));
        assert_eq!(pool.response_timeout, Duration::from_secs(3));
        assert_eq!(pool.max_retries, 2);
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = RedisConfig {
            password: "hunter2".to_string(),
            ..Default::default()
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("MORTARREDIS_HOST", "redis.local");
        std::env::set_var("MORTARREDIS_DATABASE", "3");
        std::env::set_var("MORTARREDIS_POOL_CONNECT_TIMEOUT", "2");

        let config = RedisConfig::from_env_prefixed("MORTARREDIS").unwrap();

        assert_eq!(config.host, "redis.local");
        assert_eq!(config.database, 3);
        assert_eq!(config.pool_config().connect_timeout, Duration::from_secs(2));

        for var in [
            "MORTARREDIS_HOST",
            "MORTARREDIS_DATABASE",
            "MORTARREDIS_POOL_CONNECT_TIMEOUT",
        ] {
            std::env::remove_var(var);
        }
    }
}
