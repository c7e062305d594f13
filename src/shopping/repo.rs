use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::dto::{IngredientRef, NewItem, UpdateItemRequest};
use super::repo_types::ShoppingListItemRow;
use crate::dates::DateRange;
use crate::ingredients::repo::find_or_create_tx;

const SELECT_JOINED: &str = r#"
    SELECT s.id, s.user_id, s.ingredient_id, i.name, s.start_date, s.end_date,
           s.quantity, s.unit, s.checked, s.recipe_ids, s.updated_at
"#;

/// Overrides saved for exactly this range.
pub async fn list_for_range(
    db: &PgPool,
    user_id: Uuid,
    range: &DateRange,
) -> anyhow::Result<Vec<ShoppingListItemRow>> {
    let rows = sqlx::query_as::<_, ShoppingListItemRow>(&format!(
        r#"
        {SELECT_JOINED}
          FROM shopping_list_items s
          JOIN ingredients i ON i.id = s.ingredient_id
         WHERE s.user_id = $1 AND s.start_date = $2 AND s.end_date = $3
         ORDER BY i.name ASC
        "#
    ))
    .bind(user_id)
    .bind(range.start_date)
    .bind(range.end_date)
    .fetch_all(db)
    .await
    .context("list shopping list items")?;
    Ok(rows)
}

pub async fn find(db: &PgPool, item_id: Uuid) -> anyhow::Result<Option<ShoppingListItemRow>> {
    let row = sqlx::query_as::<_, ShoppingListItemRow>(&format!(
        r#"
        {SELECT_JOINED}
          FROM shopping_list_items s
          JOIN ingredients i ON i.id = s.ingredient_id
         WHERE s.id = $1
        "#
    ))
    .bind(item_id)
    .fetch_optional(db)
    .await
    .context("find shopping list item")?;
    Ok(row)
}

/// Inserts or replaces the override for (user, ingredient, range). A missing
/// quantity or unit keeps the stored one.
pub async fn upsert(db: &PgPool, user_id: Uuid, item: &NewItem) -> anyhow::Result<ShoppingListItemRow> {
    let mut tx = db.begin().await.context("begin tx")?;
    let ingredient_id = match &item.ingredient {
        IngredientRef::Id(id) => *id,
        IngredientRef::Name(name) => find_or_create_tx(&mut tx, name).await?.id,
    };

    let row = sqlx::query_as::<_, ShoppingListItemRow>(&format!(
        r#"
        WITH s AS (
            INSERT INTO shopping_list_items
                   (user_id, ingredient_id, start_date, end_date, quantity, unit, checked, recipe_ids)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, ingredient_id, start_date, end_date) DO UPDATE
               SET quantity   = COALESCE(EXCLUDED.quantity, shopping_list_items.quantity),
                   unit       = COALESCE(EXCLUDED.unit, shopping_list_items.unit),
                   checked    = EXCLUDED.checked,
                   recipe_ids = EXCLUDED.recipe_ids,
                   updated_at = now()
            RETURNING *
        )
        {SELECT_JOINED}
          FROM s
          JOIN ingredients i ON i.id = s.ingredient_id
        "#
    ))
    .bind(user_id)
    .bind(ingredient_id)
    .bind(item.range.start_date)
    .bind(item.range.end_date)
    .bind(item.quantity)
    .bind(&item.unit)
    .bind(item.checked)
    .bind(&item.recipe_ids)
    .fetch_one(&mut *tx)
    .await
    .context("upsert shopping list item")?;

    tx.commit().await.context("commit tx")?;
    Ok(row)
}

pub async fn update(
    db: &PgPool,
    item_id: Uuid,
    patch: &UpdateItemRequest,
) -> anyhow::Result<ShoppingListItemRow> {
    let row = sqlx::query_as::<_, ShoppingListItemRow>(&format!(
        r#"
        WITH s AS (
            UPDATE shopping_list_items
               SET quantity   = CASE WHEN $6 THEN NULL ELSE COALESCE($2, quantity) END,
                   unit       = CASE WHEN $7 THEN NULL ELSE COALESCE($3, unit) END,
                   checked    = COALESCE($4, checked),
                   recipe_ids = COALESCE($5, recipe_ids),
                   updated_at = now()
             WHERE id = $1
            RETURNING *
        )
        {SELECT_JOINED}
          FROM s
          JOIN ingredients i ON i.id = s.ingredient_id
        "#
    ))
    .bind(item_id)
    .bind(patch.quantity)
    .bind(&patch.unit)
    .bind(patch.checked)
    .bind(&patch.recipe_ids)
    .bind(patch.clear_quantity)
    .bind(patch.clear_unit)
    .fetch_one(db)
    .await
    .context("update shopping list item")?;
    Ok(row)
}

pub async fn delete(db: &PgPool, item_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM shopping_list_items WHERE id = $1")
        .bind(item_id)
        .execute(db)
        .await
        .context("delete shopping list item")?;
    Ok(())
}
