/// User model and database operations
///
/// Users own tasks and carry the daily task quota (`max_todo`). They are
/// created out-of-band: by the bootstrap seed in [`crate::db::schema`] or by
/// administrative tooling through [`User::create`]. The credential hash is kept
/// out of this struct; only [`crate::auth::credentials`] reads it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE usr (
///     id              INT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
///     username        VARCHAR(64) NOT NULL UNIQUE,
///     credential_hash TEXT NOT NULL,
///     max_todo        INT NOT NULL DEFAULT 5 CHECK (max_todo >= 0)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use togo_store::models::user::{CreateUser, User};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let user = User::create(&pool, CreateUser {
///     username: "secondUser".to_string(),
///     password: "example".to_string(),
///     max_todo: 3,
/// }).await?;
///
/// let found = User::find_by_username(&pool, "secondUser").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use crate::auth::password::hash_password;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgExecutor, PgPool};
use std::fmt;
use validator::Validate;

/// A user as seen by callers of the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Store-assigned identity
    pub id: i32,

    /// Unique login name
    pub username: String,

    /// Maximum number of tasks this user may create per calendar day
    pub max_todo: i32,
}

/// Input for creating a user
///
/// `password` is plaintext here and is hashed before it reaches the database.
#[derive(Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 64, message = "username must be 1 to 64 characters"))]
    pub username: String,

    pub password: String,

    #[validate(range(min = 0, message = "max_todo must not be negative"))]
    pub max_todo: i32,
}

impl fmt::Debug for CreateUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("max_todo", &self.max_todo)
            .finish()
    }
}

impl User {
    /// Creates a user with a freshly hashed credential
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidInput`] if the username or quota is malformed
    /// - [`StoreError::Conflict`] if the username is taken
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, StoreError> {
        const OP: &str = "create_user";

        data.validate().map_err(|e| StoreError::InvalidInput {
            op: OP,
            message: e.to_string(),
        })?;

        let password = data.password;
        let credential_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| StoreError::InvalidInput {
                op: OP,
                message: format!("password hashing aborted: {}", e),
            })?
            .map_err(|e| StoreError::InvalidInput {
                op: OP,
                message: e.to_string(),
            })?;

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO usr (username, credential_hash, max_todo)
            VALUES ($1, $2, $3)
            RETURNING id, username, max_todo
            "#,
        )
        .bind(data.username)
        .bind(credential_hash)
        .bind(data.max_todo)
        .fetch_one(pool)
        .await
        .map_err(|e| StoreError::from_sqlx(OP, e))
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e, E>(executor: E, id: i32) -> Result<Option<Self>, StoreError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, max_todo
            FROM usr
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(|e| StoreError::from_sqlx("find_user_by_id", e))
    }

    /// Finds a user by username (exact, case-sensitive match)
    pub async fn find_by_username<'e, E>(
        executor: E,
        username: &str,
    ) -> Result<Option<Self>, StoreError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, max_todo
            FROM usr
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(executor)
        .await
        .map_err(|e| StoreError::from_sqlx("find_user_by_username", e))
    }

    /// Counts total number of users
    pub async fn count(pool: &PgPool) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM usr")
            .fetch_one(pool)
            .await
            .map_err(|e| StoreError::from_sqlx("count_users", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_user(username: &str, max_todo: i32) -> CreateUser {
        CreateUser {
            username: username.to_string(),
            password: "secret".to_string(),
            max_todo,
        }
    }

    #[test]
    fn test_create_user_validation() {
        assert!(create_user("firstUser", 5).validate().is_ok());
        assert!(create_user("zero", 0).validate().is_ok());
        assert!(create_user("", 5).validate().is_err());
        assert!(create_user("negative", -1).validate().is_err());
        assert!(create_user(&"x".repeat(65), 5).validate().is_err());
    }

    #[test]
    fn test_create_user_debug_redacts_password() {
        let rendered = format!("{:?}", create_user("firstUser", 5));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_user_serializes_without_credentials() {
        let user = User {
            id: 1,
            username: "firstUser".to_string(),
            max_todo: 5,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["username"], "firstUser");
        assert_eq!(json["max_todo"], 5);
        assert!(json.get("credential_hash").is_none());
    }

    // Integration tests for database operations are in tests/user_tests.rs
}
