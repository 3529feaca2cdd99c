/// Cancellation and deadlines for store operations
///
/// Store operations are plain futures. Dropping one before it completes drops
/// any [`sqlx::Transaction`] it holds, and an uncommitted transaction is rolled
/// back before its connection is reused. These helpers turn a cancellation
/// token or a deadline into that drop plus a typed error.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use tokio::time::Instant;
/// use togo_store::db::cancel::run_with_deadline;
/// use togo_store::quota::QuotaEnforcer;
/// # use chrono::NaiveDate;
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, today: NaiveDate) -> Result<(), Box<dyn std::error::Error>> {
/// let enforcer = QuotaEnforcer::new(pool);
/// let deadline = Instant::now() + Duration::from_secs(2);
///
/// let task = run_with_deadline(deadline, "create_task_for_user", async {
///     enforcer.create_task_for_user(1, "buy milk", today).await
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```

use crate::error::StoreError;
use std::future::Future;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Runs `fut` until it completes or `token` is cancelled
///
/// On cancellation `fut` is dropped and `StoreError::Cancelled { op }` is
/// converted into the caller's error type.
pub async fn run_cancellable<T, E, F>(
    token: &CancellationToken,
    op: &'static str,
    fut: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<StoreError>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(StoreError::Cancelled { op }.into()),
        result = fut => result,
    }
}

/// Runs `fut` until it completes or `deadline` passes
///
/// On expiry `fut` is dropped and `StoreError::DeadlineExceeded { op }` is
/// converted into the caller's error type.
pub async fn run_with_deadline<T, E, F>(deadline: Instant, op: &'static str, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<StoreError>,
{
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::DeadlineExceeded { op }.into()),
    }
}
