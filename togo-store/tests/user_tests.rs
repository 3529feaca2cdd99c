/// Integration tests for the user directory and credential validation
///
/// These tests require a running PostgreSQL database; see `common/mod.rs`.

mod common;

use common::{create_test_user, test_pool, TEST_PASSWORD};
use togo_store::auth::credentials::{validate, AuthError};
use togo_store::db::pool::close_pool;
use togo_store::error::StoreError;
use togo_store::models::user::{CreateUser, User};

#[tokio::test]
async fn test_validate_returns_user_and_quota() {
    let Some(pool) = test_pool().await else { return };
    let created = create_test_user(&pool, 7).await;

    let user = validate(&pool, &created.username, TEST_PASSWORD)
        .await
        .expect("Valid credentials should authenticate");

    assert_eq!(user, created);
    assert_eq!(user.max_todo, 7);

    close_pool(&pool).await;
}

#[tokio::test]
async fn test_unknown_user_and_wrong_password_are_indistinguishable() {
    let Some(pool) = test_pool().await else { return };
    let real = create_test_user(&pool, 5).await;

    let missing = validate(&pool, "nonexistent", "x").await;
    let wrong = validate(&pool, &real.username, "wrong_password").await;

    let missing = missing.expect_err("Unknown user must not authenticate");
    let wrong = wrong.expect_err("Wrong password must not authenticate");

    assert!(matches!(missing, AuthError::InvalidCredentials));
    assert!(matches!(wrong, AuthError::InvalidCredentials));
    assert_eq!(missing.to_string(), wrong.to_string());

    close_pool(&pool).await;
}

#[tokio::test]
async fn test_validate_is_case_sensitive_on_username() {
    let Some(pool) = test_pool().await else { return };
    let real = create_test_user(&pool, 5).await;

    let result = validate(&pool, &real.username.to_uppercase(), TEST_PASSWORD).await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));

    close_pool(&pool).await;
}

#[tokio::test]
async fn test_validate_surfaces_store_failure() {
    let Some(pool) = test_pool().await else { return };
    close_pool(&pool).await;

    let result = validate(&pool, "firstUser", "example").await;
    assert!(
        matches!(result, Err(AuthError::Store(StoreError::Closed { .. }))),
        "Expected store failure, got {:?}",
        result
    );
}

#[tokio::test]
async fn test_validate_reports_corrupt_credential() {
    let Some(pool) = test_pool().await else { return };
    let user = create_test_user(&pool, 5).await;

    sqlx::query("UPDATE usr SET credential_hash = $1 WHERE id = $2")
        .bind("$argon2id$invalid")
        .bind(user.id)
        .execute(&pool)
        .await
        .expect("Failed to corrupt credential");

    let result = validate(&pool, &user.username, TEST_PASSWORD).await;
    assert!(
        matches!(result, Err(AuthError::Password(_))),
        "Expected password error, got {:?}",
        result
    );

    close_pool(&pool).await;
}

#[tokio::test]
async fn test_create_user_rejects_duplicate_username() {
    let Some(pool) = test_pool().await else { return };
    let existing = create_test_user(&pool, 5).await;

    let result = User::create(
        &pool,
        CreateUser {
            username: existing.username.clone(),
            password: "another".to_string(),
            max_todo: 1,
        },
    )
    .await;

    assert!(matches!(result, Err(StoreError::Conflict { .. })));

    close_pool(&pool).await;
}

#[tokio::test]
async fn test_find_user() {
    let Some(pool) = test_pool().await else { return };
    let created = create_test_user(&pool, 2).await;

    let by_id = User::find_by_id(&pool, created.id).await.expect("find_by_id");
    assert_eq!(by_id.as_ref(), Some(&created));

    let by_name = User::find_by_username(&pool, &created.username)
        .await
        .expect("find_by_username");
    assert_eq!(by_name, Some(created));

    let missing = User::find_by_id(&pool, i32::MAX).await.expect("find_by_id");
    assert!(missing.is_none());

    assert!(User::count(&pool).await.expect("count") >= 1);

    close_pool(&pool).await;
}
