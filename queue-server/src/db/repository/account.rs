//! Staff Account Repository

use shared::models::Account;
use sqlx::SqlitePool;

use super::{RepoError, RepoResult};
use crate::auth::password;
use crate::utils::time::now_ms;

const ACCOUNT_COLUMNS: &str = "id, username, password_hash, display_name, is_active, created_at";

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> RepoResult<Option<Account>> {
    let account = sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM account WHERE username = ? LIMIT 1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(account)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Account>> {
    let account = sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(account)
}

pub async fn create(
    pool: &SqlitePool,
    username: &str,
    plain_password: &str,
    display_name: &str,
) -> RepoResult<Account> {
    let hash = password::hash_password(plain_password)
        .map_err(|e| RepoError::Database(format!("Password hashing failed: {e}")))?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO account (username, password_hash, display_name, is_active, created_at) \
         VALUES (?, ?, ?, 1, ?) RETURNING id",
    )
    .bind(username)
    .bind(hash)
    .bind(display_name)
    .bind(now_ms())
    .fetch_one(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create account".into()))
}

pub async fn count(pool: &SqlitePool) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// First-run bootstrap: create an admin account when none exists, so a
/// fresh install can log in. With no `ADMIN_PASSWORD` configured, a random
/// one is generated and logged once.
pub async fn ensure_default_admin(
    pool: &SqlitePool,
    username: &str,
    configured_password: Option<&str>,
) -> RepoResult<()> {
    if count(pool).await? > 0 {
        return Ok(());
    }

    let generated;
    let plain = match configured_password {
        Some(p) => p,
        None => {
            generated = uuid::Uuid::new_v4().simple().to_string();
            tracing::warn!(
                username,
                password = %generated,
                "No staff accounts found; created default admin with a generated password — change it immediately"
            );
            generated.as_str()
        }
    };

    create(pool, username, plain, "Administrator").await?;
    tracing::info!(username, "Default staff account created");
    Ok(())
}
