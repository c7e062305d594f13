use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::aggregate::{aggregate, Override, RecipeLine, ShoppingItem};
use super::repo;
use super::repo_types::ShoppingListItemRow;
use crate::dates::DateRange;
use crate::error::{ensure_owner, AppError, AppResult};
use crate::{meal_plans, recipes};

/// Derives the shopping list for `range` from the user's overlapping plans
/// and the overrides saved for that exact range.
pub async fn shopping_list(db: &PgPool, user_id: Uuid, range: &DateRange) -> AppResult<Vec<ShoppingItem>> {
    let plans = meal_plans::repo::list_overlapping(db, user_id, range).await?;
    let recipe_ids = meal_plans::services::recipe_ids_in_order(plans.iter().flat_map(|p| p.days.0.iter()));

    let lines: Vec<RecipeLine> = recipes::repo::owned_lines_for(db, user_id, &recipe_ids)
        .await?
        .into_iter()
        .map(|l| RecipeLine {
            recipe_id: l.recipe_id,
            ingredient_id: l.ingredient_id,
            name: l.name,
            quantity: l.quantity,
            unit: l.unit,
        })
        .collect();
    let overrides: Vec<Override> = repo::list_for_range(db, user_id, range)
        .await?
        .into_iter()
        .map(Override::from)
        .collect();

    debug!(
        %user_id,
        plans = plans.len(),
        recipes = recipe_ids.len(),
        overrides = overrides.len(),
        "aggregating shopping list"
    );
    Ok(aggregate(&lines, &overrides))
}

pub async fn load_owned(db: &PgPool, user_id: Uuid, item_id: Uuid) -> AppResult<ShoppingListItemRow> {
    let row = repo::find(db, item_id).await?;
    ensure_owner("shopping list item", row.as_ref().map(|r| r.user_id), user_id)?;
    row.ok_or(AppError::NotFound("shopping list item"))
}

/// Recipe ids on an item must belong to the user.
pub async fn check_recipe_ids(db: &PgPool, user_id: Uuid, ids: &[Uuid]) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let mut distinct = ids.to_vec();
    distinct.sort();
    distinct.dedup();
    if recipes::repo::count_owned(db, user_id, &distinct).await? != distinct.len() as i64 {
        return Err(AppError::validation("recipeIds reference unknown recipes"));
    }
    Ok(())
}
