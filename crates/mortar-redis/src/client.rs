use crate::config::RedisConfig;
use mortar_core::ConfigError;
use redis::aio::MultiplexedConnection;
use redis::{Client, IntoConnectionInfo};
use std::time::Duration;
use thiserror::Error;

/// Errors returned while connecting to Redis
#[derive(Debug, Error)]
pub enum RedisError {
    /// Opening the connection or the `PING` check failed
    #[error("failed to connect to Redis: {0}")]
    Connect(#[from] redis::RedisError),

    /// The server did not answer in time
    #[error("timed out connecting to Redis after {0:?}")]
    Timeout(Duration),

    /// Loading settings from the environment failed
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A Redis connection that answered `PING` when it was opened.
///
/// The connection is multiplexed; [`RedisClient::connection`] hands out cheap
/// clones that share it.
#[derive(Clone)]
pub struct RedisClient {
    client: Client,
    connection: MultiplexedConnection,
    config: RedisConfig,
}

impl RedisClient {
    /// Connect and verify the server with `PING`.
    pub async fn connect(config: RedisConfig) -> Result<Self, RedisError> {
        let config = config.with_defaults();
        let pool = config.pool_config();

        let mut info = (config.host.as_str(), config.port).into_connection_info()?;
        info.redis.db = config.database;
        if !config.password.is_empty() {
            info.redis.password = Some(config.password.clone());
        }

        let client = Client::open(info)?;
        let mut connection =
            tokio::time::timeout(pool.connect_timeout, client.get_multiplexed_tokio_connection())
                .await
                .map_err(|_| RedisError::Timeout(pool.connect_timeout))??;

        let attempts = pool.max_retries.saturating_add(1);
        let mut attempt = 1;
        loop {
            match ping(&mut connection, pool.response_timeout).await {
                Ok(()) => break,
                Err(err) if attempt < attempts => {
                    tracing::warn!(
                        attempt,
                        total_attempts = attempts,
                        error = %err,
                        "Redis PING failed, retrying"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            address = %config.address(),
            database = config.database,
            "Connected to Redis"
        );

        Ok(Self {
            client,
            connection,
            config,
        })
    }

    /// A handle to the shared multiplexed connection
    pub fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }

    /// The underlying client, for opening dedicated connections
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Settings in effect, defaults applied
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn ping(connection: &mut MultiplexedConnection, timeout: Duration) -> Result<(), RedisError> {
    let reply = tokio::time::timeout(
        timeout,
        redis::cmd("PING").query_async::<_, String>(connection),
    )
    .await
    .map_err(|_| RedisError::Timeout(timeout))??;

    tracing::debug!(reply = %reply, "Redis PING");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedisPoolConfig;

    #[tokio::test]
    async fn test_unreachable_server_fails() {
        let config = RedisConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            pool: Some(RedisPoolConfig {
                connect_timeout: Duration::from_secs(2),
                ..Default::default()
            }),
            ..Default::default()
        };

        let err = RedisClient::connect(config).await.unwrap_err();
        assert!(matches!(
            err,
            RedisError::Connect(_) | RedisError::Timeout(_)
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = RedisError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "timed out connecting to Redis after 5s");
    }
}
