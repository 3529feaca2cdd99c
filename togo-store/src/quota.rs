/// Daily task quota enforcement
///
/// Every user may create at most `usr.max_todo` tasks per calendar day.
/// [`QuotaEnforcer::create_task_for_user`] checks and inserts in one
/// transaction while holding a row lock on the user, so concurrent requests
/// for the same user, from this process or any other replica, are serialized
/// by PostgreSQL and cannot both take the last slot.
///
/// # Protocol
///
/// ```text
/// BEGIN
///   SELECT max_todo FROM usr WHERE id = $user FOR UPDATE   -- waits for other creators of $user
///   SELECT CURRENT_DATE                                   -- must equal the requested day
///   SELECT COUNT(*) FROM task WHERE usr_id = $user AND created_at on $day
///   count >= max_todo  → ROLLBACK, DailyLimitExceeded
///   INSERT INTO task ... NOW()
/// COMMIT
/// ```
///
/// Under READ COMMITTED each statement takes a fresh snapshot, so the count
/// that follows a lock wait already includes the rows committed by the
/// transaction that held the lock. Requests for different users lock
/// different rows and proceed in parallel.
///
/// # Example
///
/// ```no_run
/// use togo_store::models::task::Task;
/// use togo_store::quota::{QuotaEnforcer, QuotaError};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let today = Task::store_date(&pool).await?;
/// let enforcer = QuotaEnforcer::new(pool);
///
/// match enforcer.create_task_for_user(1, "buy milk", today).await {
///     Ok(task) => println!("created task {}", task.id),
///     Err(QuotaError::DailyLimitExceeded { limit, .. }) => {
///         println!("only {} tasks per day", limit)
///     }
///     Err(e) => return Err(e.into()),
/// }
/// # Ok(())
/// # }
/// ```

use crate::error::StoreError;
use crate::models::task::{NewTask, Task};
use crate::models::user::User;
use chrono::NaiveDate;
use sqlx::PgPool;
use validator::Validate;

/// Quota enforcement error
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    /// The user already created `max_todo` tasks today
    #[error("daily task limit reached for user {user_id} ({current}/{limit})")]
    DailyLimitExceeded {
        user_id: i32,
        limit: i64,
        current: i64,
    },

    /// The caller's "today" is not the store's current date
    ///
    /// New tasks are stamped with the store clock, so checking any other day
    /// would enforce the quota on the wrong bucket.
    #[error("requested day {requested} differs from store day {store}")]
    DayMismatch {
        requested: NaiveDate,
        store: NaiveDate,
    },

    /// Persistence failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QuotaError {
    /// True when the request was refused by policy rather than by a fault
    pub fn is_policy_rejection(&self) -> bool {
        matches!(self, QuotaError::DailyLimitExceeded { .. })
    }

    /// True when the same request may succeed if retried
    ///
    /// A [`QuotaError::DayMismatch`] is retryable once the caller has re-read
    /// the store's date.
    pub fn is_retryable(&self) -> bool {
        match self {
            QuotaError::DayMismatch { .. } => true,
            QuotaError::Store(e) => e.is_retryable(),
            QuotaError::DailyLimitExceeded { .. } => false,
        }
    }
}

/// Result of quota check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaCheckResult {
    /// Whether one more task is within quota
    pub allowed: bool,

    /// Tasks already created on the day
    pub current: i64,

    /// Maximum allowed per day
    pub limit: i64,

    /// Remaining quota
    pub remaining: i64,
}

impl QuotaCheckResult {
    /// Creates a result indicating quota is available
    pub fn allowed(current: i64, limit: i64) -> Self {
        QuotaCheckResult {
            allowed: true,
            current,
            limit,
            remaining: (limit - current).max(0),
        }
    }

    /// Creates a result indicating quota is exceeded
    pub fn exceeded(current: i64, limit: i64) -> Self {
        QuotaCheckResult {
            allowed: false,
            current,
            limit,
            remaining: 0,
        }
    }

    /// Decides whether one more task fits under `limit`
    pub fn evaluate(current: i64, limit: i64) -> Self {
        if current >= limit {
            Self::exceeded(current, limit)
        } else {
            Self::allowed(current, limit)
        }
    }
}

/// Quota-enforcing front end to the task store
#[derive(Debug, Clone)]
pub struct QuotaEnforcer {
    db: PgPool,
}

impl QuotaEnforcer {
    /// Creates a new quota enforcer
    pub fn new(db: PgPool) -> Self {
        QuotaEnforcer { db }
    }

    /// Creates a task for `user_id` if today's quota allows it
    ///
    /// `today` must be the store's current date (see [`Task::store_date`]).
    /// Blocks while another creation for the same user is in flight.
    ///
    /// # Errors
    ///
    /// - [`QuotaError::DailyLimitExceeded`] if the user has no slots left today;
    ///   nothing is written
    /// - [`QuotaError::DayMismatch`] if `today` is not the store's date; near
    ///   midnight the store's date can roll over after the caller read it, so
    ///   callers should fetch a fresh [`Task::store_date`] and retry (see
    ///   [`QuotaError::is_retryable`])
    /// - [`QuotaError::Store`] with [`StoreError::ForeignKey`] for an unknown user,
    ///   [`StoreError::InvalidInput`] for empty content, or any other store failure
    pub async fn create_task_for_user(
        &self,
        user_id: i32,
        content: &str,
        today: NaiveDate,
    ) -> Result<Task, QuotaError> {
        const OP: &str = "create_task_for_user";

        let new_task = NewTask::new(user_id, content);
        new_task.validate().map_err(|e| StoreError::InvalidInput {
            op: OP,
            message: e.to_string(),
        })?;

        let mut tx = self
            .db
            .begin()
            .await
            .map_err(|e| StoreError::from_sqlx(OP, e))?;

        let limit: i32 = sqlx::query_scalar(
            r#"
            SELECT max_todo
            FROM usr
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StoreError::from_sqlx(OP, e))?
        .ok_or(StoreError::ForeignKey {
            op: OP,
            owner_id: user_id,
        })?;

        // Early returns drop `tx`, which rolls it back and releases the lock.
        let store_today = Task::store_date(&mut *tx).await?;
        if store_today != today {
            return Err(QuotaError::DayMismatch {
                requested: today,
                store: store_today,
            });
        }

        let current = Task::count_on_day(&mut *tx, user_id, today).await?;
        let check = QuotaCheckResult::evaluate(current, i64::from(limit));
        if !check.allowed {
            return Err(QuotaError::DailyLimitExceeded {
                user_id,
                limit: check.limit,
                current: check.current,
            });
        }

        let task = Task::insert(&mut *tx, &new_task).await?;

        tx.commit()
            .await
            .map_err(|e| StoreError::from_sqlx(OP, e))?;

        Ok(task)
    }

    /// Reports quota usage for `user_id` on `day` without locking
    ///
    /// Advisory only: the answer can be stale by the time the caller acts on
    /// it. Enforcement happens in [`QuotaEnforcer::create_task_for_user`].
    pub async fn check(&self, user_id: i32, day: NaiveDate) -> Result<QuotaCheckResult, QuotaError> {
        let user = User::find_by_id(&self.db, user_id)
            .await?
            .ok_or(StoreError::ForeignKey {
                op: "check_quota",
                owner_id: user_id,
            })?;

        let current = Task::count_on_day(&self.db, user_id, day).await?;

        Ok(QuotaCheckResult::evaluate(current, i64::from(user.max_todo)))
    }

    /// Lists the user's tasks on `day`; listing is not subject to quota
    pub async fn list_tasks_for_user(
        &self,
        user_id: i32,
        day: NaiveDate,
    ) -> Result<Vec<Task>, QuotaError> {
        Ok(Task::list_on_day(&self.db, user_id, day).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_below_limit() {
        let result = QuotaCheckResult::evaluate(4, 5);
        assert!(result.allowed);
        assert_eq!(result.current, 4);
        assert_eq!(result.limit, 5);
        assert_eq!(result.remaining, 1);
    }

    #[test]
    fn test_evaluate_at_limit_is_exceeded() {
        let result = QuotaCheckResult::evaluate(5, 5);
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
    }

    #[test]
    fn test_evaluate_zero_quota_rejects_everything() {
        assert!(!QuotaCheckResult::evaluate(0, 0).allowed);
    }

    #[test]
    fn test_evaluate_over_limit_after_quota_lowered() {
        let result = QuotaCheckResult::evaluate(7, 5);
        assert!(!result.allowed);
        assert_eq!(result.current, 7);
        assert_eq!(result.remaining, 0);
    }

    #[test]
    fn test_quota_error_display() {
        let err = QuotaError::DailyLimitExceeded {
            user_id: 1,
            limit: 5,
            current: 5,
        };
        assert_eq!(err.to_string(), "daily task limit reached for user 1 (5/5)");
        assert!(err.is_policy_rejection());

        let err = QuotaError::DayMismatch {
            requested: NaiveDate::from_ymd_opt(2020, 6, 29).unwrap(),
            store: NaiveDate::from_ymd_opt(2020, 6, 30).unwrap(),
        };
        assert!(err.to_string().contains("2020-06-29"));
        assert!(!err.is_policy_rejection());
    }

    #[test]
    fn test_retryable_errors() {
        let mismatch = QuotaError::DayMismatch {
            requested: NaiveDate::from_ymd_opt(2020, 6, 29).unwrap(),
            store: NaiveDate::from_ymd_opt(2020, 6, 30).unwrap(),
        };
        assert!(mismatch.is_retryable());

        let limit = QuotaError::DailyLimitExceeded {
            user_id: 1,
            limit: 5,
            current: 5,
        };
        assert!(!limit.is_retryable());

        assert!(QuotaError::from(StoreError::Timeout { op: "create_task_for_user" }).is_retryable());
        assert!(!QuotaError::from(StoreError::ForeignKey {
            op: "create_task_for_user",
            owner_id: 1,
        })
        .is_retryable());
    }

    #[test]
    fn test_store_error_is_not_policy_rejection() {
        let err = QuotaError::from(StoreError::Timeout {
            op: "create_task_for_user",
        });
        assert!(!err.is_policy_rejection());
    }

    #[tokio::test]
    async fn test_empty_content_rejected_before_transaction() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        let enforcer = QuotaEnforcer::new(pool);
        let today = NaiveDate::from_ymd_opt(2020, 6, 29).unwrap();

        let result = enforcer.create_task_for_user(1, "", today).await;
        assert!(matches!(
            result,
            Err(QuotaError::Store(StoreError::InvalidInput { .. }))
        ));
    }
}
