use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::ShoppingListItemRow;
use crate::dates::DateRange;
use crate::error::{AppError, AppResult};

/// A persisted override as returned by the item endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListItem {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub name: String,
    pub start_date: Date,
    pub end_date: Date,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub checked: bool,
    pub recipe_ids: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ShoppingListItemRow> for ShoppingListItem {
    fn from(r: ShoppingListItemRow) -> Self {
        Self {
            id: r.id,
            ingredient_id: r.ingredient_id,
            name: r.name,
            start_date: r.start_date,
            end_date: r.end_date,
            quantity: r.quantity,
            unit: r.unit,
            checked: r.checked,
            recipe_ids: r.recipe_ids,
            updated_at: r.updated_at,
        }
    }
}

/// Body of `POST /shopping-list-items`. The ingredient is given by id, or by
/// name for items added by hand.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    #[serde(default)]
    pub ingredient_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    pub start_date: Date,
    pub end_date: Date,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub recipe_ids: Vec<Uuid>,
}

/// Body of `PUT /shopping-list-items/:id`; absent fields stay unchanged.
/// `clearQuantity` and `clearUnit` drop an override so the recipe-derived
/// value shows again.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub clear_quantity: bool,
    #[serde(default)]
    pub clear_unit: bool,
    #[serde(default)]
    pub checked: Option<bool>,
    #[serde(default)]
    pub recipe_ids: Option<Vec<Uuid>>,
}

/// Which ingredient a new item refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum IngredientRef {
    Id(Uuid),
    Name(String),
}

/// A create request that passed validation.
#[derive(Debug)]
pub struct NewItem {
    pub ingredient: IngredientRef,
    pub range: DateRange,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub checked: bool,
    pub recipe_ids: Vec<Uuid>,
}

fn check_quantity(q: Option<f64>, errors: &mut Vec<String>) {
    if matches!(q, Some(v) if !v.is_finite() || v <= 0.0) {
        errors.push("quantity must be positive".to_string());
    }
}

fn clean_unit(unit: Option<String>) -> Option<String> {
    unit.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

impl CreateItemRequest {
    pub fn validate(self) -> AppResult<NewItem> {
        let range = DateRange::new(self.start_date, self.end_date)?;
        let mut errors = Vec::new();
        check_quantity(self.quantity, &mut errors);

        let name = self.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let ingredient = match (self.ingredient_id, name) {
            (Some(id), _) => Some(IngredientRef::Id(id)),
            (None, Some(name)) => Some(IngredientRef::Name(name)),
            (None, None) => {
                errors.push("ingredientId or name is required".to_string());
                None
            }
        };

        match ingredient {
            Some(ingredient) if errors.is_empty() => Ok(NewItem {
                ingredient,
                range,
                quantity: self.quantity,
                unit: clean_unit(self.unit),
                checked: self.checked,
                recipe_ids: self.recipe_ids,
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

impl UpdateItemRequest {
    pub fn validate(mut self) -> AppResult<Self> {
        let mut errors = Vec::new();
        check_quantity(self.quantity, &mut errors);
        if self.clear_quantity && self.quantity.is_some() {
            errors.push("quantity and clearQuantity are exclusive".to_string());
        }
        self.unit = clean_unit(self.unit);
        if self.clear_unit && self.unit.is_some() {
            errors.push("unit and clearUnit are exclusive".to_string());
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn create(start: Date, end: Date) -> CreateItemRequest {
        CreateItemRequest {
            ingredient_id: None,
            name: Some("  Dish soap ".into()),
            start_date: start,
            end_date: end,
            quantity: None,
            unit: Some(" ".into()),
            checked: false,
            recipe_ids: vec![],
        }
    }

    #[test]
    fn name_only_item_is_accepted() {
        let item = create(date!(2024 - 06 - 03), date!(2024 - 06 - 09)).validate().unwrap();
        assert_eq!(item.ingredient, IngredientRef::Name("Dish soap".into()));
        assert_eq!(item.unit, None);
    }

    #[test]
    fn range_rules_apply_to_items() {
        assert!(create(date!(2024 - 06 - 09), date!(2024 - 06 - 03)).validate().is_err());
        assert!(create(date!(2024 - 06 - 01), date!(2024 - 07 - 09)).validate().is_err());
    }

    #[test]
    fn needs_an_ingredient() {
        let mut req = create(date!(2024 - 06 - 03), date!(2024 - 06 - 03));
        req.name = Some("   ".into());
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn update_rejects_non_positive_quantity() {
        let req = UpdateItemRequest { quantity: Some(0.0), ..Default::default() };
        assert!(req.validate().is_err());
    }

    #[test]
    fn clearing_flags_are_read_and_exclusive_with_values() {
        let req: UpdateItemRequest =
            serde_json::from_str(r#"{"clearQuantity":true,"clearUnit":true}"#).unwrap();
        let req = req.validate().unwrap();
        assert!(req.clear_quantity && req.clear_unit);

        let both = UpdateItemRequest { quantity: Some(2.0), clear_quantity: true, ..Default::default() };
        assert!(both.validate().is_err());
        let unit = UpdateItemRequest { unit: Some("kg".into()), clear_unit: true, ..Default::default() };
        assert!(unit.validate().is_err());
    }
}
