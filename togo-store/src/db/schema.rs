/// Schema initialization
///
/// [`ensure_schema`] brings a database up to the current layout and seeds the
/// bootstrap user. It is meant to run on every startup: migrations already
/// recorded in `_sqlx_migrations` are skipped, the migrator serializes
/// concurrent callers with an advisory lock, and the seed only fires while the
/// `usr` table is empty.
///
/// # Example
///
/// ```no_run
/// use togo_store::db::pool::{create_pool, PoolSettings, StoreConfig};
/// use togo_store::db::schema::{ensure_schema, BootstrapUser};
///
/// # async fn example(config: StoreConfig) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(&config, &PoolSettings::default()).await?;
/// let report = ensure_schema(&pool, &BootstrapUser::default()).await?;
/// println!("bootstrap user seeded: {}", report.seeded_bootstrap_user);
/// # Ok(())
/// # }
/// ```

use crate::auth::password::hash_password;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPool;
use std::fmt;
use tracing::{debug, info, warn};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// The user created when the directory is empty
#[derive(Clone, Serialize, Deserialize)]
pub struct BootstrapUser {
    pub username: String,
    pub password: String,
    pub max_todo: i32,
}

impl Default for BootstrapUser {
    fn default() -> Self {
        Self {
            username: "firstUser".to_string(),
            password: "example".to_string(),
            max_todo: 5,
        }
    }
}

impl fmt::Debug for BootstrapUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("max_todo", &self.max_todo)
            .finish()
    }
}

/// Outcome of [`ensure_schema`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReport {
    /// Number of migrations recorded as applied after the run
    pub applied_migrations: usize,

    /// Whether this call inserted the bootstrap user
    pub seeded_bootstrap_user: bool,
}

/// Migration status information
#[derive(Debug, Clone)]
pub struct SchemaStatus {
    /// Number of migrations that have been applied
    pub applied_migrations: usize,

    /// Latest applied migration version (timestamp)
    pub latest_version: Option<i64>,

    /// Whether every embedded migration has been applied
    pub is_up_to_date: bool,
}

/// Creates tables and indexes if absent, then seeds the bootstrap user
///
/// Safe to call on every startup and from several replicas at once.
///
/// # Errors
///
/// - [`StoreError::Schema`] if a migration fails, an applied migration was
///   modified, or the database has migrations this build does not know
/// - [`StoreError::InvalidInput`] if the bootstrap user is malformed
/// - other [`StoreError`] variants if seeding fails
pub async fn ensure_schema(
    pool: &PgPool,
    bootstrap: &BootstrapUser,
) -> Result<SchemaReport, StoreError> {
    info!("Ensuring database schema");

    MIGRATOR.run(pool).await.map_err(|e| {
        warn!(error = %e, "Schema migration failed");
        StoreError::Schema(e.to_string())
    })?;

    let seeded_bootstrap_user = seed_bootstrap_user(pool, bootstrap).await?;
    let status = get_schema_status(pool).await?;

    info!(
        applied_migrations = status.applied_migrations,
        seeded_bootstrap_user, "Database schema is ready"
    );

    Ok(SchemaReport {
        applied_migrations: status.applied_migrations,
        seeded_bootstrap_user,
    })
}

async fn seed_bootstrap_user(pool: &PgPool, bootstrap: &BootstrapUser) -> Result<bool, StoreError> {
    const OP: &str = "seed_bootstrap_user";

    let has_users: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM usr)")
        .fetch_one(pool)
        .await
        .map_err(|e| StoreError::from_sqlx(OP, e))?;

    if has_users {
        debug!("User directory already populated, skipping bootstrap user");
        return Ok(false);
    }

    if bootstrap.username.is_empty() || bootstrap.max_todo < 0 {
        return Err(StoreError::InvalidInput {
            op: OP,
            message: "bootstrap user needs a username and a non-negative max_todo".to_string(),
        });
    }

    let password = bootstrap.password.clone();
    let credential_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| StoreError::Schema(format!("bootstrap password hashing aborted: {}", e)))?
        .map_err(|e| StoreError::Schema(e.to_string()))?;

    // Re-checks emptiness in the statement; a replica that lost the race inserts nothing.
    let result = sqlx::query(
        r#"
        INSERT INTO usr (username, credential_hash, max_todo)
        SELECT $1, $2, $3
        WHERE NOT EXISTS (SELECT 1 FROM usr)
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind(&bootstrap.username)
    .bind(credential_hash)
    .bind(bootstrap.max_todo)
    .execute(pool)
    .await
    .map_err(|e| StoreError::from_sqlx(OP, e))?;

    let seeded = result.rows_affected() > 0;
    if seeded {
        info!(username = %bootstrap.username, "Seeded bootstrap user");
    }

    Ok(seeded)
}

/// Gets the current migration status
pub async fn get_schema_status(pool: &PgPool) -> Result<SchemaStatus, StoreError> {
    const OP: &str = "get_schema_status";

    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await
    .map_err(|e| StoreError::from_sqlx(OP, e))?;

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(SchemaStatus {
            applied_migrations: 0,
            latest_version: None,
            is_up_to_date: false,
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT
            COUNT(*) as count,
            MAX(version) as latest_version
         FROM _sqlx_migrations
         WHERE success = true",
    )
    .fetch_one(pool)
    .await
    .map_err(|e| StoreError::from_sqlx(OP, e))?;

    let expected = MIGRATOR.iter().filter(|m| !m.migration_type.is_down_migration()).count();

    debug!(
        applied_migrations = count,
        latest_version = ?latest_version,
        expected_migrations = expected,
        "Migration status retrieved"
    );

    Ok(SchemaStatus {
        applied_migrations: count as usize,
        latest_version,
        is_up_to_date: count as usize >= expected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_user_default() {
        let user = BootstrapUser::default();
        assert_eq!(user.username, "firstUser");
        assert_eq!(user.password, "example");
        assert_eq!(user.max_todo, 5);
    }

    #[test]
    fn test_bootstrap_user_debug_redacts_password() {
        let rendered = format!("{:?}", BootstrapUser::default());
        assert!(rendered.contains("firstUser"));
        assert!(!rendered.contains("example"));
    }

    #[test]
    fn test_embedded_migrations_present() {
        assert!(MIGRATOR.iter().count() >= 1);
    }

    // Integration tests require a running database and live in tests/
}
