/// Username/password validation against the user directory
///
/// An unknown username and a wrong password produce the same
/// [`AuthError::InvalidCredentials`], and both run one Argon2 verification
/// (against [`dummy_hash`] when the user is missing), so neither the result nor
/// the latency tells a caller which usernames exist.
///
/// # Example
///
/// ```no_run
/// use togo_store::auth::credentials::{validate, AuthError};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// match validate(&pool, "firstUser", "example").await {
///     Ok(user) => println!("welcome {}, {} tasks per day", user.username, user.max_todo),
///     Err(AuthError::InvalidCredentials) => println!("try again"),
///     Err(e) => return Err(e.into()),
/// }
/// # Ok(())
/// # }
/// ```

use super::password::{dummy_hash, verify_password, PasswordError};
use crate::error::StoreError;
use crate::models::user::User;
use sqlx::PgPool;

/// Authentication failure
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown username or wrong password; deliberately not distinguished
    #[error("username or password is not correct")]
    InvalidCredentials,

    /// The directory could not be read
    #[error("validate_user: {0}")]
    Store(#[from] StoreError),

    /// The stored credential could not be parsed or verified
    #[error("validate_user: {0}")]
    Password(#[from] PasswordError),
}

impl AuthError {
    /// True for the expected "wrong username or password" outcome
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, AuthError::InvalidCredentials)
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: i32,
    username: String,
    credential_hash: String,
    max_todo: i32,
}

/// Validates `username` and `password`, returning the user on success
///
/// # Errors
///
/// - [`AuthError::InvalidCredentials`] for an unknown user or wrong password
/// - [`AuthError::Store`] if the lookup fails
/// - [`AuthError::Password`] if the stored hash is corrupt
pub async fn validate(pool: &PgPool, username: &str, password: &str) -> Result<User, AuthError> {
    const OP: &str = "validate_user";

    let row = sqlx::query_as::<_, CredentialRow>(
        r#"
        SELECT id, username, credential_hash, max_todo
        FROM usr
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .map_err(|e| StoreError::from_sqlx(OP, e))?;

    let (user, stored_hash) = match row {
        Some(row) => (
            Some(User {
                id: row.id,
                username: row.username,
                max_todo: row.max_todo,
            }),
            Some(row.credential_hash),
        ),
        None => (None, None),
    };

    let password = password.to_owned();
    let matched = tokio::task::spawn_blocking(move || -> Result<bool, PasswordError> {
        match stored_hash {
            Some(hash) => verify_password(&password, &hash),
            None => {
                // Burn the same work as a real check, then reject.
                verify_password(&password, dummy_hash()?)?;
                Ok(false)
            }
        }
    })
    .await
    .map_err(|e| PasswordError::VerifyError(format!("verification aborted: {}", e)))??;

    match user {
        Some(user) if matched => Ok(user),
        _ => Err(AuthError::InvalidCredentials),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_credentials_message_is_generic() {
        let err = AuthError::InvalidCredentials;
        assert_eq!(err.to_string(), "username or password is not correct");
        assert!(err.is_invalid_credentials());
    }

    #[test]
    fn test_store_failure_is_not_invalid_credentials() {
        let err = AuthError::from(StoreError::Closed { op: "validate_user" });
        assert!(!err.is_invalid_credentials());
        assert!(err.to_string().contains("connection pool is closed"));
    }

    // Integration tests against a live directory are in tests/user_tests.rs
}
