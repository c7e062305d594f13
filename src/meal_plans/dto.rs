use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub const ALL: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Dinner];
}

/// Stored slot. `participants: None` means the slot was never edited and
/// follows the household default when read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSlot {
    #[serde(default)]
    pub recipe_ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDay {
    pub date: Date,
    #[serde(default)]
    pub meals: BTreeMap<MealType, MealSlot>,
}

impl PlanDay {
    pub fn empty(date: Date) -> Self {
        Self { date, meals: BTreeMap::new() }
    }
}

/// Body of `POST /meal-plans` and `PUT /meal-plans/:id`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanRequest {
    pub week_start: Date,
    pub week_end: Date,
    #[serde(default)]
    pub days: Vec<PlanDay>,
}

/// Body of `PUT /meal-plans/:id/slots`; absent fields stay unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotEditRequest {
    pub date: Date,
    pub meal_type: MealType,
    #[serde(default)]
    pub recipe_ids: Option<Vec<Uuid>>,
    #[serde(default)]
    pub participants: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanListQuery {
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub recipe_ids: Vec<Uuid>,
    pub participants: Vec<Uuid>,
    /// False while the slot follows the household default.
    pub participants_edited: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub date: Date,
    pub meals: BTreeMap<MealType, SlotView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    pub id: Uuid,
    pub week_start: Date,
    pub week_end: Date,
    pub days: Vec<DayView>,
}
