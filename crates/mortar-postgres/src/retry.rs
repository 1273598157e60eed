use crate::error::PostgresError;
use async_trait::async_trait;
use std::time::Duration;

/// The steps of a single connection attempt.
///
/// [`retry_connection`] drives these in order (open, ping, validate) and
/// closes the pool whenever a later step fails.
#[async_trait]
pub trait PoolConnector: Send + Sync {
    /// Pool handle produced on success
    type Pool: Send + Sync;

    /// Open a new pool
    async fn open(&self) -> Result<Self::Pool, sqlx::Error>;

    /// Check that the server answers
    async fn ping(&self, pool: &Self::Pool) -> Result<(), sqlx::Error>;

    /// Run the validation query
    async fn validate(&self, pool: &Self::Pool, query: &str) -> Result<(), sqlx::Error>;

    /// Release a pool from a failed attempt
    async fn close(&self, pool: Self::Pool);
}

/// How many times to try, how long to wait between tries, and what to run
/// to validate a fresh pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Query that must succeed on a fresh pool
    pub validation_query: String,
    /// Total attempts, at least one is always made
    pub attempts: u32,
    /// Fixed delay between attempts
    pub interval: Duration,
}

/// Try to obtain a validated pool, retrying at a fixed interval.
///
/// Before every attempt after the first a `warn` event carrying the previous
/// error is emitted and the task sleeps for `policy.interval`. Failed pings
/// and validations are logged at `error`. Returns the first pool that passes
/// both checks, or [`PostgresError::ConnectionExhausted`] with the last error.
pub async fn retry_connection<C>(connector: &C, policy: &RetryPolicy) -> Result<C::Pool, PostgresError>
where
    C: PoolConnector,
{
    let total_attempts = policy.attempts.max(1);
    let mut last_error: Option<sqlx::Error> = None;

    for attempt in 1..=total_attempts {
        if attempt > 1 {
            let previous = last_error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            tracing::warn!(
                attempt,
                total_attempts,
                error = %previous,
                "Retrying database connection"
            );
            tokio::time::sleep(policy.interval).await;
        }

        let pool = match connector.open().await {
            Ok(pool) => pool,
            Err(err) => {
                tracing::error!(
                    attempt,
                    total_attempts,
                    error = %err,
                    "Opening pool failed during database connection attempt"
                );
                last_error = Some(err);
                continue;
            }
        };

        if let Err(err) = connector.ping(&pool).await {
            connector.close(pool).await;
            tracing::error!(
                attempt,
                total_attempts,
                error = %err,
                "Ping failed during database connection attempt"
            );
            last_error = Some(err);
            continue;
        }

        if let Err(err) = connector.validate(&pool, &policy.validation_query).await {
            connector.close(pool).await;
            tracing::error!(
                attempt,
                total_attempts,
                error = %err,
                query = %policy.validation_query,
                "Validation query failed during database connection attempt"
            );
            last_error = Some(err);
            continue;
        }

        tracing::debug!(attempt, total_attempts, "Database connection established");
        return Ok(pool);
    }

    Err(PostgresError::ConnectionExhausted {
        attempts: total_attempts,
        source: last_error
            .unwrap_or_else(|| sqlx::Error::Configuration("no connection attempt was made".into())),
    })
}
