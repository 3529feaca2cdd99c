/// Authentication against the user directory
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`credentials`]: username/password validation returning the [`User`](crate::models::user::User)
///
/// # Example
///
/// ```no_run
/// use togo_store::auth::credentials::validate;
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let user = validate(&pool, "firstUser", "example").await?;
/// # Ok(())
/// # }
/// ```

pub mod credentials;
pub mod password;
