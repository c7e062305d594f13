use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};

use super::{canonical_name, contains_pattern, Ingredient};

/// Maps a free-text name to its catalog row, creating it on first use.
pub async fn find_or_create_tx(
    tx: &mut Transaction<'_, Postgres>,
    raw_name: &str,
) -> anyhow::Result<Ingredient> {
    let name = canonical_name(raw_name);
    anyhow::ensure!(!name.is_empty(), "ingredient name is empty");

    // DO UPDATE (not DO NOTHING) so RETURNING yields the existing row too
    let row = sqlx::query_as::<_, Ingredient>(
        r#"
        INSERT INTO ingredients (name)
        VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id, name
        "#,
    )
    .bind(&name)
    .fetch_one(&mut **tx)
    .await
    .with_context(|| format!("upsert ingredient {name}"))?;
    Ok(row)
}

pub async fn search(db: &PgPool, query: Option<&str>, limit: i64) -> anyhow::Result<Vec<Ingredient>> {
    let pattern = contains_pattern(&canonical_name(query.unwrap_or_default()));
    let rows = sqlx::query_as::<_, Ingredient>(
        r#"
        SELECT id, name
          FROM ingredients
         WHERE name LIKE $1 ESCAPE '\'
         ORDER BY name ASC
         LIMIT $2
        "#,
    )
    .bind(pattern)
    .bind(limit)
    .fetch_all(db)
    .await
    .context("search ingredients")?;
    Ok(rows)
}

pub async fn exists(db: &PgPool, ingredient_id: uuid::Uuid) -> anyhow::Result<bool> {
    let found = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM ingredients WHERE id = $1)")
        .bind(ingredient_id)
        .fetch_one(db)
        .await
        .context("check ingredient")?;
    Ok(found)
}
