/// Task model and database operations
///
/// Tasks are immutable once written: this module only inserts, counts and
/// lists them. Every function takes a generic executor, so it runs equally on
/// the pool or inside an open transaction (see [`crate::quota`]).
///
/// # Calendar days
///
/// A task belongs to the date of its `created_at` in the database session's
/// timezone. Day filters are half-open ranges `[day, day + 1)` so the
/// `(usr_id, created_at)` index serves them.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE task (
///     id          INT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
///     usr_id      INT NOT NULL REFERENCES usr(id),
///     content     TEXT NOT NULL CHECK (content <> ''),
///     created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use togo_store::models::task::{NewTask, Task};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let today = Task::store_date(&pool).await?;
///
/// Task::insert(&pool, &NewTask::new(1, "water the plants")).await?;
///
/// let count = Task::count_on_day(&pool, 1, today).await?;
/// let tasks = Task::list_on_day(&pool, 1, today).await?;
/// assert_eq!(count as usize, tasks.len());
/// # Ok(())
/// # }
/// ```

use crate::error::StoreError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgExecutor;
use validator::Validate;

/// A stored task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Store-assigned identity, increasing with insertion order
    pub id: i32,

    /// Owning user
    pub owner_id: i32,

    /// Task text
    pub content: String,

    /// Store-assigned insertion time
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a task
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewTask {
    pub owner_id: i32,

    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
}

impl NewTask {
    pub fn new(owner_id: i32, content: impl Into<String>) -> Self {
        Self {
            owner_id,
            content: content.into(),
        }
    }
}

impl Task {
    /// Inserts a task stamped with the store's `now()`
    ///
    /// This does not look at the owner's quota; use
    /// [`crate::quota::QuotaEnforcer::create_task_for_user`] for that.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidInput`] for empty content
    /// - [`StoreError::ForeignKey`] if `owner_id` is not a user
    /// - [`StoreError::NoRowsAffected`] if the insert reported no row
    /// - [`StoreError::Failure`] for any other write failure
    pub async fn insert<'e, E>(executor: E, data: &NewTask) -> Result<Self, StoreError>
    where
        E: PgExecutor<'e>,
    {
        const OP: &str = "insert_task";

        data.validate().map_err(|e| StoreError::InvalidInput {
            op: OP,
            message: e.to_string(),
        })?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO task (usr_id, content, created_at)
            VALUES ($1, $2, NOW())
            RETURNING id, usr_id AS owner_id, content, created_at
            "#,
        )
        .bind(data.owner_id)
        .bind(&data.content)
        .fetch_optional(executor)
        .await
        .map_err(|e| StoreError::from_sqlx_with_owner(OP, e, data.owner_id))?;

        task.ok_or(StoreError::NoRowsAffected { op: OP })
    }

    /// Counts the user's tasks created on `day`
    ///
    /// Unknown users simply have zero tasks.
    pub async fn count_on_day<'e, E>(
        executor: E,
        user_id: i32,
        day: NaiveDate,
    ) -> Result<i64, StoreError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM task
            WHERE usr_id = $1
              AND created_at >= $2::date
              AND created_at < ($2::date + 1)
            "#,
        )
        .bind(user_id)
        .bind(day)
        .fetch_one(executor)
        .await
        .map_err(|e| StoreError::from_sqlx("count_tasks_on_day", e))
    }

    /// Lists the user's tasks created on `day`, oldest id first
    pub async fn list_on_day<'e, E>(
        executor: E,
        user_id: i32,
        day: NaiveDate,
    ) -> Result<Vec<Self>, StoreError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, usr_id AS owner_id, content, created_at
            FROM task
            WHERE usr_id = $1
              AND created_at >= $2::date
              AND created_at < ($2::date + 1)
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .bind(day)
        .fetch_all(executor)
        .await
        .map_err(|e| StoreError::from_sqlx("list_tasks_on_day", e))
    }

    /// The store's current calendar date in the session timezone
    ///
    /// Inside a transaction this is fixed at the transaction's start, the same
    /// instant `NOW()` stamps onto inserted tasks.
    pub async fn store_date<'e, E>(executor: E) -> Result<NaiveDate, StoreError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar("SELECT CURRENT_DATE")
            .fetch_one(executor)
            .await
            .map_err(|e| StoreError::from_sqlx("store_date", e))
    }
}
