use anyhow::Context;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::dto::PlanDay;
use super::repo_types::MealPlanRow;
use crate::dates::DateRange;

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<MealPlanRow>> {
    let rows = sqlx::query_as::<_, MealPlanRow>(
        r#"
        SELECT id, user_id, week_start, week_end, days, created_at, updated_at
          FROM meal_plans
         WHERE user_id = $1
         ORDER BY week_start ASC, created_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list meal plans")?;
    Ok(rows)
}

/// Plans whose `[week_start, week_end]` intersects `range`, oldest week first.
pub async fn list_overlapping(
    db: &PgPool,
    user_id: Uuid,
    range: &DateRange,
) -> anyhow::Result<Vec<MealPlanRow>> {
    let rows = sqlx::query_as::<_, MealPlanRow>(
        r#"
        SELECT id, user_id, week_start, week_end, days, created_at, updated_at
          FROM meal_plans
         WHERE user_id = $1
           AND week_start <= $3
           AND week_end >= $2
         ORDER BY week_start ASC, created_at ASC
        "#,
    )
    .bind(user_id)
    .bind(range.start_date)
    .bind(range.end_date)
    .fetch_all(db)
    .await
    .context("list overlapping meal plans")?;
    Ok(rows)
}

pub async fn find(db: &PgPool, plan_id: Uuid) -> anyhow::Result<Option<MealPlanRow>> {
    let row = sqlx::query_as::<_, MealPlanRow>(
        r#"
        SELECT id, user_id, week_start, week_end, days, created_at, updated_at
          FROM meal_plans
         WHERE id = $1
        "#,
    )
    .bind(plan_id)
    .fetch_optional(db)
    .await
    .context("find meal plan")?;
    Ok(row)
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    range: &DateRange,
    days: &[PlanDay],
) -> anyhow::Result<MealPlanRow> {
    let row = sqlx::query_as::<_, MealPlanRow>(
        r#"
        INSERT INTO meal_plans (user_id, week_start, week_end, days)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, week_start, week_end, days, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(range.start_date)
    .bind(range.end_date)
    .bind(Json(days))
    .fetch_one(db)
    .await
    .context("insert meal plan")?;
    Ok(row)
}

pub async fn update(
    db: &PgPool,
    plan_id: Uuid,
    range: &DateRange,
    days: &[PlanDay],
) -> anyhow::Result<MealPlanRow> {
    let row = sqlx::query_as::<_, MealPlanRow>(
        r#"
        UPDATE meal_plans
           SET week_start = $2, week_end = $3, days = $4, updated_at = now()
         WHERE id = $1
        RETURNING id, user_id, week_start, week_end, days, created_at, updated_at
        "#,
    )
    .bind(plan_id)
    .bind(range.start_date)
    .bind(range.end_date)
    .bind(Json(days))
    .fetch_one(db)
    .await
    .context("update meal plan")?;
    Ok(row)
}

pub async fn delete(db: &PgPool, plan_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM meal_plans WHERE id = $1")
        .bind(plan_id)
        .execute(db)
        .await
        .context("delete meal plan")?;
    Ok(())
}
