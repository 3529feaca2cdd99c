//! Shared helpers for the store integration tests
//!
//! These tests need a PostgreSQL database. Connection settings come from
//! `TOGO_TEST_DB_HOST`, `TOGO_TEST_DB_PORT`, `TOGO_TEST_DB_USERNAME`,
//! `TOGO_TEST_DB_PASSWORD` and `TOGO_TEST_DB_DATABASE_NAME`, defaulting to
//! `togo:togo@localhost:5432/togo_test`. When the database is unreachable the
//! tests print a notice and return early.
//!
//! Run with: cargo test -p togo-store --tests

#![allow(dead_code)]

use sqlx::PgPool;
use std::env;
use togo_store::db::pool::{create_pool, PoolSettings, StoreConfig};
use togo_store::db::schema::{ensure_schema, BootstrapUser};
use togo_store::error::StoreError;
use togo_store::models::user::{CreateUser, User};
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Connection settings for the test database
pub fn test_store_config() -> StoreConfig {
    let var = |name: &str, default: &str| env::var(name).unwrap_or_else(|_| default.to_string());

    StoreConfig {
        host: var("TOGO_TEST_DB_HOST", "localhost"),
        port: var("TOGO_TEST_DB_PORT", "5432").parse().unwrap_or(5432),
        username: var("TOGO_TEST_DB_USERNAME", "togo"),
        password: var("TOGO_TEST_DB_PASSWORD", "togo"),
        database_name: var("TOGO_TEST_DB_DATABASE_NAME", "togo_test"),
    }
}

/// Pool settings suited to tests: fail fast when the database is down
pub fn test_pool_settings() -> PoolSettings {
    PoolSettings {
        max_connections: 16,
        min_connections: 0,
        acquire_timeout_seconds: 5,
        ..Default::default()
    }
}

/// Opens a pool on the test database with the schema in place
///
/// Returns `None` (and prints why) if the database cannot be reached.
pub async fn test_pool() -> Option<PgPool> {
    test_pool_with(test_pool_settings()).await
}

pub async fn test_pool_with(settings: PoolSettings) -> Option<PgPool> {
    let pool = match create_pool(&test_store_config(), &settings).await {
        Ok(pool) => pool,
        Err(StoreError::Connection(e)) => {
            eprintln!("skipping: test database unavailable ({})", e);
            return None;
        }
        Err(e) => panic!("unexpected error creating pool: {}", e),
    };

    ensure_schema(&pool, &BootstrapUser::default())
        .await
        .expect("Failed to ensure schema");

    Some(pool)
}

/// Creates a user with a unique name and the given daily quota
pub async fn create_test_user(pool: &PgPool, max_todo: i32) -> User {
    User::create(
        pool,
        CreateUser {
            username: format!("user-{}", Uuid::new_v4()),
            password: TEST_PASSWORD.to_string(),
            max_todo,
        },
    )
    .await
    .expect("Failed to create test user")
}

/// Inserts a task with an explicit timestamp, bypassing the store clock
///
/// `created_at` is interpreted in the session timezone, like day filters.
pub async fn insert_task_at(pool: &PgPool, user_id: i32, content: &str, created_at: &str) {
    sqlx::query("INSERT INTO task (usr_id, content, created_at) VALUES ($1, $2, $3::timestamptz)")
        .bind(user_id)
        .bind(content)
        .bind(created_at)
        .execute(pool)
        .await
        .expect("Failed to insert backdated task");
}
