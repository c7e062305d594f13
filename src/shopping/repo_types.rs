use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::aggregate::Override;

/// Persisted override joined with its ingredient name.
#[derive(Debug, Clone, FromRow)]
pub struct ShoppingListItemRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ingredient_id: Uuid,
    pub name: String,
    pub start_date: Date,
    pub end_date: Date,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub checked: bool,
    pub recipe_ids: Vec<Uuid>,
    pub updated_at: OffsetDateTime,
}

impl From<ShoppingListItemRow> for Override {
    fn from(r: ShoppingListItemRow) -> Self {
        Self {
            id: r.id,
            ingredient_id: r.ingredient_id,
            name: r.name,
            quantity: r.quantity,
            unit: r.unit,
            checked: r.checked,
            recipe_ids: r.recipe_ids,
        }
    }
}
