//! Shopping list derivation.
//!
//! Recipe lines from every plan overlapping the requested range are merged per
//! ingredient, then persisted overrides for that exact range are layered on
//! top. Quantities are summed without unit conversion; the last unit seen is
//! kept.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

/// One ingredient line of a recipe in range.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeLine {
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

/// A persisted shopping-list item for the requested range.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub checked: bool,
    pub recipe_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    /// Id of the persisted override, if one exists.
    pub id: Option<Uuid>,
    pub ingredient_id: Uuid,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub checked: bool,
    pub recipe_ids: Vec<Uuid>,
}

fn push_unique(ids: &mut Vec<Uuid>, id: Uuid) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

/// Unchecked before checked, then by name.
pub fn sort_items(items: &mut [ShoppingItem]) {
    items.sort_by(|a, b| a.checked.cmp(&b.checked).then_with(|| a.name.cmp(&b.name)));
}

/// Merges recipe lines and overrides into the sorted list.
///
/// `lines` must already be restricted to distinct recipes the user owns; each
/// recipe contributes its lines once however many slots reference it.
pub fn aggregate(lines: &[RecipeLine], overrides: &[Override]) -> Vec<ShoppingItem> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut acc: HashMap<Uuid, ShoppingItem> = HashMap::new();

    for line in lines {
        match acc.get_mut(&line.ingredient_id) {
            None => {
                order.push(line.ingredient_id);
                acc.insert(
                    line.ingredient_id,
                    ShoppingItem {
                        id: None,
                        ingredient_id: line.ingredient_id,
                        name: line.name.clone(),
                        quantity: line.quantity,
                        unit: line.unit.clone(),
                        checked: false,
                        recipe_ids: vec![line.recipe_id],
                    },
                );
            }
            Some(item) => {
                push_unique(&mut item.recipe_ids, line.recipe_id);
                item.quantity = match (item.quantity, line.quantity) {
                    (Some(a), Some(b)) => Some(a + b),
                    (None, q) => q,
                    (q, None) => q,
                };
                if line.unit.is_some() {
                    item.unit = line.unit.clone();
                }
            }
        }
    }

    for o in overrides {
        match acc.get_mut(&o.ingredient_id) {
            Some(item) => {
                item.id = Some(o.id);
                item.checked = o.checked;
                if o.quantity.is_some() {
                    item.quantity = o.quantity;
                }
                if o.unit.is_some() {
                    item.unit = o.unit.clone();
                }
                for rid in &o.recipe_ids {
                    push_unique(&mut item.recipe_ids, *rid);
                }
            }
            None => {
                order.push(o.ingredient_id);
                acc.insert(
                    o.ingredient_id,
                    ShoppingItem {
                        id: Some(o.id),
                        ingredient_id: o.ingredient_id,
                        name: o.name.clone(),
                        quantity: o.quantity,
                        unit: o.unit.clone(),
                        checked: o.checked,
                        recipe_ids: o.recipe_ids.clone(),
                    },
                );
            }
        }
    }

    let mut items: Vec<ShoppingItem> = order.iter().filter_map(|id| acc.remove(id)).collect();
    sort_items(&mut items);
    items
}
