//! # Togo Store
//!
//! Persistence layer for the togo task tracker: users authenticate with a
//! username and password, and each user may create tasks up to a daily quota.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool, schema initialization, cancellation helpers
//! - `auth`: Password hashing and credential validation
//! - `models`: Users and tasks
//! - `quota`: Transactional, quota-enforcing task creation
//! - `error`: Store error type
//!
//! ## Example
//!
//! ```no_run
//! use togo_store::auth::credentials::validate;
//! use togo_store::db::pool::{create_pool, PoolSettings, StoreConfig};
//! use togo_store::db::schema::{ensure_schema, BootstrapUser};
//! use togo_store::models::task::Task;
//! use togo_store::quota::QuotaEnforcer;
//!
//! # async fn example(config: StoreConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(&config, &PoolSettings::default()).await?;
//! ensure_schema(&pool, &BootstrapUser::default()).await?;
//!
//! let user = validate(&pool, "firstUser", "example").await?;
//! let today = Task::store_date(&pool).await?;
//!
//! let enforcer = QuotaEnforcer::new(pool.clone());
//! enforcer.create_task_for_user(user.id, "first task", today).await?;
//! let tasks = enforcer.list_tasks_for_user(user.id, today).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod quota;

pub use error::StoreError;

/// Current version of the togo store library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
