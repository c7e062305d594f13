use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{RecipeLineRow, RecipeRow};
use crate::acquisition::RecipePreview;
use crate::ingredients::contains_pattern;
use crate::ingredients::repo::find_or_create_tx;

const RECIPE_COLUMNS: &str = "id, user_id, title, description, instructions, prep_time, \
     cook_time, servings, image, image_key, sources, created_at, updated_at";

pub async fn find(db: &PgPool, recipe_id: Uuid) -> anyhow::Result<Option<RecipeRow>> {
    let row = sqlx::query_as::<_, RecipeRow>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"
    ))
    .bind(recipe_id)
    .fetch_optional(db)
    .await
    .context("find recipe")?;
    Ok(row)
}

pub async fn list_by_user(
    db: &PgPool,
    user_id: Uuid,
    query: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<RecipeRow>> {
    let pattern = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(contains_pattern);
    let rows = sqlx::query_as::<_, RecipeRow>(&format!(
        r#"
        SELECT {RECIPE_COLUMNS}
          FROM recipes
         WHERE user_id = $1
           AND ($2::text IS NULL OR title ILIKE $2 ESCAPE '\')
         ORDER BY created_at DESC
         LIMIT $3 OFFSET $4
        "#
    ))
    .bind(user_id)
    .bind(pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list recipes")?;
    Ok(rows)
}

/// Ingredient lines of the given recipes, grouped by recipe in the order the
/// ids were passed and by position within each recipe.
pub async fn lines_for(db: &PgPool, recipe_ids: &[Uuid]) -> anyhow::Result<Vec<RecipeLineRow>> {
    if recipe_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, RecipeLineRow>(
        r#"
        SELECT ri.recipe_id, ri.ingredient_id, i.name, ri.quantity, ri.unit, ri.notes, ri.position
          FROM recipe_ingredients ri
          JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE ri.recipe_id = ANY($1)
         ORDER BY array_position($1, ri.recipe_id), ri.position
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await
    .context("list recipe ingredients")?;
    Ok(rows)
}

/// Like [`lines_for`], restricted to recipes `user_id` still owns.
pub async fn owned_lines_for(
    db: &PgPool,
    user_id: Uuid,
    recipe_ids: &[Uuid],
) -> anyhow::Result<Vec<RecipeLineRow>> {
    if recipe_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, RecipeLineRow>(
        r#"
        SELECT ri.recipe_id, ri.ingredient_id, i.name, ri.quantity, ri.unit, ri.notes, ri.position
          FROM recipe_ingredients ri
          JOIN recipes r ON r.id = ri.recipe_id
          JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE ri.recipe_id = ANY($1) AND r.user_id = $2
         ORDER BY array_position($1, ri.recipe_id), ri.position
        "#,
    )
    .bind(recipe_ids)
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list owned recipe ingredients")?;
    Ok(rows)
}

async fn insert_lines_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    recipe: &RecipePreview,
) -> anyhow::Result<()> {
    for (position, line) in recipe.ingredients.iter().enumerate() {
        let ingredient = find_or_create_tx(tx, &line.name).await?;
        sqlx::query(
            r#"
            INSERT INTO recipe_ingredients (recipe_id, ingredient_id, position, quantity, unit, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(recipe_id)
        .bind(ingredient.id)
        .bind(position as i32)
        .bind(line.quantity)
        .bind(&line.unit)
        .bind(&line.notes)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("insert ingredient line {position}"))?;
    }
    Ok(())
}

/// Inserts the recipe and its ingredient lines in one transaction.
pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    recipe: &RecipePreview,
    image: Option<&str>,
) -> anyhow::Result<Uuid> {
    let mut tx = db.begin().await.context("begin tx")?;
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO recipes (user_id, title, description, instructions, prep_time, cook_time,
                             servings, image, sources)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&recipe.title)
    .bind(&recipe.description)
    .bind(&recipe.instructions)
    .bind(recipe.prep_time)
    .bind(recipe.cook_time)
    .bind(recipe.servings)
    .bind(image)
    .bind(recipe.sources.clone().unwrap_or_default())
    .fetch_one(&mut *tx)
    .await
    .context("insert recipe")?;

    insert_lines_tx(&mut tx, id, recipe).await?;
    tx.commit().await.context("commit tx")?;
    Ok(id)
}

/// Replaces every field and the full ingredient list.
pub async fn update(
    db: &PgPool,
    recipe_id: Uuid,
    recipe: &RecipePreview,
    image: Option<&str>,
) -> anyhow::Result<()> {
    let mut tx = db.begin().await.context("begin tx")?;
    sqlx::query(
        r#"
        UPDATE recipes
           SET title = $2, description = $3, instructions = $4, prep_time = $5,
               cook_time = $6, servings = $7, image = $8, sources = $9, updated_at = now()
         WHERE id = $1
        "#,
    )
    .bind(recipe_id)
    .bind(&recipe.title)
    .bind(&recipe.description)
    .bind(&recipe.instructions)
    .bind(recipe.prep_time)
    .bind(recipe.cook_time)
    .bind(recipe.servings)
    .bind(image)
    .bind(recipe.sources.clone().unwrap_or_default())
    .execute(&mut *tx)
    .await
    .context("update recipe")?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .context("clear ingredient lines")?;
    insert_lines_tx(&mut tx, recipe_id, recipe).await?;

    tx.commit().await.context("commit tx")?;
    Ok(())
}

/// Ingredient lines go with it through `ON DELETE CASCADE`.
pub async fn delete(db: &PgPool, recipe_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .execute(db)
        .await
        .context("delete recipe")?;
    Ok(())
}

pub async fn set_image_key(db: &PgPool, recipe_id: Uuid, key: &str) -> anyhow::Result<()> {
    sqlx::query("UPDATE recipes SET image_key = $2, updated_at = now() WHERE id = $1")
        .bind(recipe_id)
        .bind(key)
        .execute(db)
        .await
        .context("set recipe image key")?;
    Ok(())
}

/// How many of `ids` belong to `user_id`.
pub async fn count_owned(db: &PgPool, user_id: Uuid, ids: &[Uuid]) -> anyhow::Result<i64> {
    let n = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM recipes WHERE user_id = $1 AND id = ANY($2)",
    )
    .bind(user_id)
    .bind(ids)
    .fetch_one(db)
    .await
    .context("count owned recipes")?;
    Ok(n)
}
