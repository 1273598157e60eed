use crate::config::{ConnectionConfig, PoolConfig};
use crate::error::PostgresError;
use crate::retry::{retry_connection, PoolConnector};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, PgPool};
use std::sync::Arc;

/// An established, validated PostgreSQL pool.
///
/// Owned by the caller; [`Database::close`] releases every connection.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    config: ConnectionConfig,
}

impl Database {
    /// Connect with retries.
    ///
    /// Fills unset settings with defaults, then retries open/ping/validate up
    /// to `retry_attempts` times, `retry_interval` apart. This is the only
    /// fallible entry point.
    pub async fn connect(config: ConnectionConfig) -> Result<Self, PostgresError> {
        let config = config.with_defaults();
        let connector = SqlxConnector::new(&config)?;
        let policy = connector.pool_config().retry_policy();

        let pool = retry_connection(&connector, &policy).await?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Connected to database"
        );

        Ok(Self { pool, config })
    }

    /// The live pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Settings in effect, defaults applied
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Close every connection. Further acquires fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// [`PoolConnector`] backed by sqlx.
///
/// Pools it opens run the validation query before every checkout and discard
/// connections that fail it.
#[derive(Debug, Clone)]
pub struct SqlxConnector {
    connect_options: PgConnectOptions,
    pool: PoolConfig,
}

impl SqlxConnector {
    /// Build a connector from connection parameters
    pub fn new(config: &ConnectionConfig) -> Result<Self, PostgresError> {
        Ok(Self {
            connect_options: config.connect_options()?,
            pool: config.pool_config(),
        })
    }

    /// Pool settings used for new pools
    pub fn pool_config(&self) -> &PoolConfig {
        &self.pool
    }

    fn pool_options(&self) -> PgPoolOptions {
        let query: Arc<str> = Arc::from(self.pool.validation_query.as_str());

        self.pool
            .pool_options()
            .before_acquire(move |conn, _meta| {
                let query = Arc::clone(&query);
                Box::pin(async move {
                    match sqlx::query(&query).fetch_optional(&mut *conn).await {
                        Ok(_) => Ok(true),
                        Err(err) => {
                            tracing::error!(
                                error = %err,
                                query = %query,
                                "validation query failed"
                            );
                            Ok(false)
                        }
                    }
                })
            })
    }
}

#[async_trait]
impl PoolConnector for SqlxConnector {
    type Pool = PgPool;

    async fn open(&self) -> Result<PgPool, sqlx::Error> {
        self.pool_options()
            .connect_with(self.connect_options.clone())
            .await
    }

    async fn ping(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        let mut conn = pool.acquire().await?;
        conn.ping().await
    }

    async fn validate(&self, pool: &PgPool, query: &str) -> Result<(), sqlx::Error> {
        sqlx::query(query).fetch_one(pool).await.map(|_| ())
    }

    async fn close(&self, pool: PgPool) {
        pool.close().await;
    }
}
