use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::UserRow;

pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<UserRow>> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, email, password_hash, created_at
          FROM users
         WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await
    .context("find user by email")?;
    Ok(user)
}

pub async fn find(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<UserRow>> {
    let user = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, password_hash, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("find user")?;
    Ok(user)
}

/// Inserts the account; `None` when the email is already taken.
pub async fn create(db: &PgPool, email: &str, password_hash: &str) -> anyhow::Result<Option<UserRow>> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (email, password_hash)
        VALUES ($1, $2)
        ON CONFLICT (email) DO NOTHING
        RETURNING id, email, password_hash, created_at
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .fetch_optional(db)
    .await
    .context("create user")?;
    Ok(user)
}
