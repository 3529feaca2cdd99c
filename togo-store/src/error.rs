/// Error types for the persistence layer
///
/// Every error produced by a store operation carries the name of the operation
/// that failed (`op`), so callers can log or map it without extra context.
///
/// # Classification
///
/// Driver errors are classified by [`StoreError::from_sqlx`]:
///
/// | sqlx error                    | StoreError      |
/// |-------------------------------|-----------------|
/// | `PoolClosed`                  | `Closed`        |
/// | `PoolTimedOut`                | `Timeout`       |
/// | foreign key violation         | `ForeignKey`    |
/// | unique violation              | `Conflict`      |
/// | anything else                 | `Failure`       |

use sqlx::error::ErrorKind;

/// Persistence error with the failing operation attached
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database is unreachable or rejected the credentials
    #[error("failed to connect to database: {0}")]
    Connection(#[source] sqlx::Error),

    /// The pool has been shut down
    #[error("{op}: connection pool is closed")]
    Closed { op: &'static str },

    /// Schema initialization failed or the existing schema conflicts
    #[error("schema initialization failed: {0}")]
    Schema(String),

    /// The referenced user does not exist
    #[error("{op}: user {owner_id} does not exist")]
    ForeignKey { op: &'static str, owner_id: i32 },

    /// A unique constraint was violated
    #[error("{op}: unique constraint {constraint} violated")]
    Conflict { op: &'static str, constraint: String },

    /// Input rejected before reaching the database
    #[error("{op}: invalid input: {message}")]
    InvalidInput { op: &'static str, message: String },

    /// A write statement reported zero affected rows
    #[error("{op}: no rows affected")]
    NoRowsAffected { op: &'static str },

    /// No pooled connection became available within the acquire timeout
    #[error("{op}: timed out waiting for a database connection")]
    Timeout { op: &'static str },

    /// The caller cancelled the operation
    #[error("{op}: cancelled")]
    Cancelled { op: &'static str },

    /// The caller's deadline passed before the operation finished
    #[error("{op}: deadline exceeded")]
    DeadlineExceeded { op: &'static str },

    /// Any other driver or database failure
    #[error("{op}: {source}")]
    Failure {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    /// Classifies a driver error raised while running `op`
    ///
    /// Foreign key violations are reported without an owner id; use
    /// [`StoreError::from_sqlx_with_owner`] when the referenced user is known.
    pub fn from_sqlx(op: &'static str, err: sqlx::Error) -> Self {
        Self::from_sqlx_with_owner(op, err, 0)
    }

    /// Like [`StoreError::from_sqlx`], attaching `owner_id` to foreign key violations
    pub fn from_sqlx_with_owner(op: &'static str, err: sqlx::Error, owner_id: i32) -> Self {
        match err {
            sqlx::Error::PoolClosed => StoreError::Closed { op },
            sqlx::Error::PoolTimedOut => StoreError::Timeout { op },
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::ForeignKeyViolation => StoreError::ForeignKey { op, owner_id },
                ErrorKind::UniqueViolation => StoreError::Conflict {
                    op,
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                },
                _ => StoreError::Failure {
                    op,
                    source: sqlx::Error::Database(db_err),
                },
            },
            other => StoreError::Failure { op, source: other },
        }
    }

    /// Whether retrying the same operation later may succeed
    ///
    /// Infrastructure conditions are retryable; caller bugs, policy outcomes and
    /// closed handles are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Connection(_)
                | StoreError::Timeout { .. }
                | StoreError::DeadlineExceeded { .. }
        )
    }

    /// Name of the operation that failed, if the error is tied to one
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            StoreError::Closed { op }
            | StoreError::ForeignKey { op, .. }
            | StoreError::Conflict { op, .. }
            | StoreError::InvalidInput { op, .. }
            | StoreError::NoRowsAffected { op }
            | StoreError::Timeout { op }
            | StoreError::Cancelled { op }
            | StoreError::DeadlineExceeded { op }
            | StoreError::Failure { op, .. } => Some(op),
            StoreError::Connection(_) | StoreError::Schema(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_closed_maps_to_closed() {
        let err = StoreError::from_sqlx("insert_task", sqlx::Error::PoolClosed);
        assert!(matches!(err, StoreError::Closed { op: "insert_task" }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_pool_timeout_is_retryable() {
        let err = StoreError::from_sqlx("count_tasks_on_day", sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Timeout { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_other_errors_become_failure() {
        let err = StoreError::from_sqlx("list_tasks_on_day", sqlx::Error::RowNotFound);
        match err {
            StoreError::Failure { op, .. } => assert_eq!(op, "list_tasks_on_day"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_display_includes_operation() {
        let err = StoreError::ForeignKey {
            op: "insert_task",
            owner_id: 42,
        };
        assert_eq!(err.to_string(), "insert_task: user 42 does not exist");

        let err = StoreError::NoRowsAffected { op: "insert_task" };
        assert_eq!(err.to_string(), "insert_task: no rows affected");
    }

    #[test]
    fn test_operation_accessor() {
        assert_eq!(
            StoreError::Cancelled { op: "create_task_for_user" }.operation(),
            Some("create_task_for_user")
        );
        assert_eq!(StoreError::Schema("boom".to_string()).operation(), None);
    }
}
