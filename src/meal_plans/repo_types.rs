use sqlx::{types::Json, FromRow};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::dto::PlanDay;

#[derive(Debug, Clone, FromRow)]
pub struct MealPlanRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week_start: Date,
    pub week_end: Date,
    pub days: Json<Vec<PlanDay>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
