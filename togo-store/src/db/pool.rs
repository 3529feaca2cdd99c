/// Database connection pool management
///
/// This module owns the PostgreSQL connection pool: creation from an explicit
/// [`StoreConfig`], health checks, scoped connection acquisition and shutdown.
/// The returned [`PgPool`] is the handle every other operation takes; there is
/// no process-wide pool.
///
/// # Example
///
/// ```no_run
/// use togo_store::db::pool::{close_pool, create_pool, PoolSettings, StoreConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = StoreConfig {
///     host: "localhost".to_string(),
///     port: 5432,
///     username: "togo".to_string(),
///     password: "togo".to_string(),
///     database_name: "togo".to_string(),
/// };
///
/// let pool = create_pool(&config, &PoolSettings::default()).await?;
///
/// let row: (i64,) = sqlx::query_as("SELECT $1")
///     .bind(42i64)
///     .fetch_one(&pool)
///     .await?;
///
/// close_pool(&pool).await;
/// # Ok(())
/// # }
/// ```

use crate::error::StoreError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPool, PgPoolOptions};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};
use validator::Validate;

/// Connection parameters for the relational store
///
/// Every field is required; there are no defaults.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct StoreConfig {
    /// Database server host name or address
    #[validate(length(min = 1, message = "host must not be empty"))]
    pub host: String,

    /// Database server port
    #[validate(range(min = 1, message = "port must be greater than zero"))]
    pub port: u16,

    /// Role to connect as
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: String,

    /// Password for `username`
    pub password: String,

    /// Database to open
    #[validate(length(min = 1, message = "database_name must not be empty"))]
    pub database_name: String,
}

impl StoreConfig {
    /// Builds sqlx connect options from the configuration
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database_name)
    }
}

// Hand-written so the password never ends up in logs.
impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database_name", &self.database_name)
            .finish()
    }
}

/// Tuning knobs for the connection pool
///
/// All timeouts are specified in seconds for ease of configuration from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    ///
    /// Default: 10
    pub max_connections: u32,

    /// Minimum number of idle connections to maintain
    ///
    /// Default: 1
    pub min_connections: u32,

    /// How long an operation waits for a free connection (seconds)
    ///
    /// Default: 30. Exceeding it yields a retryable [`StoreError::Timeout`].
    pub acquire_timeout_seconds: u64,

    /// How long a connection can remain idle before being closed (seconds)
    ///
    /// Default: Some(600)
    pub idle_timeout_seconds: Option<u64>,

    /// Maximum lifetime of a connection before forced recycling (seconds)
    ///
    /// Default: Some(1800)
    pub max_lifetime_seconds: Option<u64>,

    /// Whether to ping connections before handing them out
    ///
    /// Default: true
    pub test_before_acquire: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            max_lifetime_seconds: Some(1800),
            test_before_acquire: true,
        }
    }
}

/// Creates and initializes a PostgreSQL connection pool
///
/// This function:
/// 1. Validates the configuration
/// 2. Creates a pool with the requested settings
/// 3. Performs a health check to verify database connectivity
///
/// # Errors
///
/// - [`StoreError::InvalidInput`] if a required configuration value is empty
/// - [`StoreError::Connection`] if the database is unreachable or rejects the credentials
pub async fn create_pool(
    config: &StoreConfig,
    settings: &PoolSettings,
) -> Result<PgPool, StoreError> {
    config.validate().map_err(|e| StoreError::InvalidInput {
        op: "create_pool",
        message: e.to_string(),
    })?;

    info!(
        host = %config.host,
        port = config.port,
        database = %config.database_name,
        max_connections = settings.max_connections,
        min_connections = settings.min_connections,
        acquire_timeout_seconds = settings.acquire_timeout_seconds,
        "Creating database connection pool"
    );

    let mut pool_options = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_seconds))
        .test_before_acquire(settings.test_before_acquire);

    if let Some(idle_timeout) = settings.idle_timeout_seconds {
        pool_options = pool_options.idle_timeout(Duration::from_secs(idle_timeout));
        debug!(idle_timeout_seconds = idle_timeout, "Set idle timeout");
    }

    if let Some(max_lifetime) = settings.max_lifetime_seconds {
        pool_options = pool_options.max_lifetime(Duration::from_secs(max_lifetime));
        debug!(max_lifetime_seconds = max_lifetime, "Set max lifetime");
    }

    let pool = pool_options
        .connect_with(config.connect_options())
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to connect to database");
            StoreError::Connection(e)
        })?;

    if let Err(e) = health_check(&pool).await {
        pool.close().await;
        return Err(e);
    }

    info!("Database connection pool created successfully");
    Ok(pool)
}

/// Performs a health check on the database connection
///
/// Executes `SELECT 1` and expects `1` back.
pub async fn health_check(pool: &PgPool) -> Result<(), StoreError> {
    debug!("Performing database health check");

    let value: i32 = sqlx::query_scalar("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| match StoreError::from_sqlx("health_check", e) {
            StoreError::Failure { source, .. } => StoreError::Connection(source),
            other => other,
        })?;

    if value == 1 {
        debug!("Database health check passed");
        Ok(())
    } else {
        warn!("Database health check returned unexpected value: {}", value);
        Err(StoreError::Connection(sqlx::Error::Protocol(
            "health check returned unexpected value".into(),
        )))
    }
}

/// Runs `f` with one pooled connection held for its whole duration
///
/// The connection goes back to the pool when `f` completes, fails, or panics,
/// and when the returned future is dropped before completion.
///
/// # Errors
///
/// - [`StoreError::Closed`] if the pool has been shut down
/// - [`StoreError::Timeout`] if no connection frees up within the acquire timeout
/// - whatever `f` returns
///
/// # Example
///
/// ```no_run
/// use futures::FutureExt;
/// use togo_store::db::pool::with_connection;
/// use togo_store::error::StoreError;
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), StoreError> {
/// let backend_pid: i32 = with_connection(&pool, "backend_pid", |conn| {
///     async move {
///         sqlx::query_scalar("SELECT pg_backend_pid()")
///             .fetch_one(&mut *conn)
///             .await
///             .map_err(|e| StoreError::from_sqlx("backend_pid", e))
///     }
///     .boxed()
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_connection<T, F>(pool: &PgPool, op: &'static str, f: F) -> Result<T, StoreError>
where
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, StoreError>>,
{
    let mut conn = pool
        .acquire()
        .await
        .map_err(|e| StoreError::from_sqlx(op, e))?;

    f(&mut *conn).await
}

/// Current pool occupancy
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub active_connections: usize,

    /// Number of idle connections available
    pub idle_connections: usize,

    /// Total connections in the pool
    pub total_connections: usize,
}

/// Gets current pool statistics for monitoring
pub fn get_pool_stats(pool: &PgPool) -> PoolStats {
    let size = pool.size();
    let idle = pool.num_idle() as u32;

    PoolStats {
        active_connections: size.saturating_sub(idle) as usize,
        idle_connections: idle as usize,
        total_connections: size as usize,
    }
}

/// Gracefully closes the connection pool
///
/// Waits for checked-out connections to be returned, then closes everything.
/// Any operation started afterwards fails with [`StoreError::Closed`].
pub async fn close_pool(pool: &PgPool) {
    info!("Closing database connection pool");
    pool.close().await;
    info!("Database connection pool closed");
}
