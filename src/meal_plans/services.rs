use std::collections::{BTreeMap, HashSet};

use sqlx::PgPool;
use uuid::Uuid;

use super::dto::{MealPlan, PlanDay, SlotEditRequest};
use super::participants::{expand, MemberSnapshot};
use super::repo;
use super::repo_types::MealPlanRow;
use crate::dates::DateRange;
use crate::error::{ensure_owner, AppError, AppResult};
use crate::{family, recipes};

fn dedup_in_order(ids: &mut Vec<Uuid>) {
    let mut seen = HashSet::new();
    ids.retain(|id| seen.insert(*id));
}

/// One entry per calendar day of `range`, in order. Provided days must fall
/// inside the range and appear once; days left out are empty.
pub fn normalize_days(range: &DateRange, days: Vec<PlanDay>) -> AppResult<Vec<PlanDay>> {
    let mut errors = Vec::new();
    let mut by_date = BTreeMap::new();
    for mut day in days {
        if !range.contains(day.date) {
            errors.push(format!("day {} is outside the plan range", day.date));
            continue;
        }
        for slot in day.meals.values_mut() {
            dedup_in_order(&mut slot.recipe_ids);
            if let Some(p) = slot.participants.as_mut() {
                dedup_in_order(p);
            }
        }
        if by_date.insert(day.date, day).is_some() {
            errors.push("each date may appear only once".to_string());
        }
    }
    if !errors.is_empty() {
        errors.dedup();
        return Err(AppError::Validation(errors));
    }
    Ok(range
        .days()
        .map(|date| by_date.remove(&date).unwrap_or_else(|| PlanDay::empty(date)))
        .collect())
}

/// Distinct recipe ids in slot order: days, then breakfast, lunch, dinner.
pub fn recipe_ids_in_order<'a>(days: impl IntoIterator<Item = &'a PlanDay>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = days
        .into_iter()
        .flat_map(|d| d.meals.values())
        .flat_map(|s| s.recipe_ids.iter().copied())
        .collect();
    dedup_in_order(&mut ids);
    ids
}

fn participant_ids(days: &[PlanDay]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = days
        .iter()
        .flat_map(|d| d.meals.values())
        .filter_map(|s| s.participants.as_ref())
        .flatten()
        .copied()
        .collect();
    dedup_in_order(&mut ids);
    ids
}

/// Rejects references to recipes or members the user does not own.
pub async fn check_references(db: &PgPool, user_id: Uuid, days: &[PlanDay]) -> AppResult<()> {
    let mut errors = Vec::new();
    let recipe_ids = recipe_ids_in_order(days);
    if !recipe_ids.is_empty()
        && recipes::repo::count_owned(db, user_id, &recipe_ids).await? != recipe_ids.len() as i64
    {
        errors.push("recipeIds reference unknown recipes".to_string());
    }
    let members = participant_ids(days);
    if !members.is_empty()
        && family::repo::count_owned(db, user_id, &members).await? != members.len() as i64
    {
        errors.push("participants reference unknown family members".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Applies a single-slot edit. Setting `participants` freezes the slot.
pub fn apply_slot_edit(range: &DateRange, days: &mut [PlanDay], edit: SlotEditRequest) -> AppResult<()> {
    if !range.contains(edit.date) {
        return Err(AppError::validation(format!(
            "date {} is outside the plan range",
            edit.date
        )));
    }
    let day = days
        .iter_mut()
        .find(|d| d.date == edit.date)
        .ok_or_else(|| AppError::validation(format!("plan has no day {}", edit.date)))?;
    let slot = day.meals.entry(edit.meal_type).or_default();
    if let Some(mut ids) = edit.recipe_ids {
        dedup_in_order(&mut ids);
        slot.recipe_ids = ids;
    }
    if let Some(mut ids) = edit.participants {
        dedup_in_order(&mut ids);
        slot.participants = Some(ids);
    }
    Ok(())
}

pub async fn load_owned(db: &PgPool, user_id: Uuid, plan_id: Uuid) -> AppResult<MealPlanRow> {
    let row = repo::find(db, plan_id).await?;
    ensure_owner("meal plan", row.as_ref().map(|r| r.user_id), user_id)?;
    row.ok_or(AppError::NotFound("meal plan"))
}

pub async fn member_snapshot(db: &PgPool, user_id: Uuid) -> AppResult<Vec<MemberSnapshot>> {
    Ok(family::repo::list_members(db, user_id)
        .await?
        .into_iter()
        .map(|m| MemberSnapshot { id: m.id, is_guest: m.is_guest })
        .collect())
}

pub fn view(row: MealPlanRow, members: &[MemberSnapshot]) -> MealPlan {
    MealPlan {
        id: row.id,
        week_start: row.week_start,
        week_end: row.week_end,
        days: expand(&row.days.0, members),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meal_plans::dto::{MealSlot, MealType};
    use time::macros::date;

    fn week() -> DateRange {
        DateRange::new(date!(2024 - 06 - 03), date!(2024 - 06 - 09)).unwrap()
    }

    fn day(date: time::Date, meal: MealType, recipes: Vec<Uuid>) -> PlanDay {
        let mut d = PlanDay::empty(date);
        d.meals.insert(meal, MealSlot { recipe_ids: recipes, participants: None });
        d
    }

    #[test]
    fn fills_every_day_of_the_range() {
        let r = Uuid::new_v4();
        let days = normalize_days(&week(), vec![day(date!(2024 - 06 - 05), MealType::Lunch, vec![r, r])]).unwrap();
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].date, date!(2024 - 06 - 03));
        assert_eq!(days[2].meals[&MealType::Lunch].recipe_ids, vec![r]);
        assert!(days[6].meals.is_empty());
    }

    #[test]
    fn rejects_days_outside_the_range_and_duplicates() {
        let out = normalize_days(&week(), vec![PlanDay::empty(date!(2024 - 06 - 10))]);
        assert!(matches!(out, Err(AppError::Validation(_))));
        let dup = normalize_days(
            &week(),
            vec![PlanDay::empty(date!(2024 - 06 - 04)), PlanDay::empty(date!(2024 - 06 - 04))],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn unknown_meal_type_does_not_deserialize() {
        let raw = serde_json::json!({ "date": "2024-06-03", "meals": { "brunch": {} } });
        assert!(serde_json::from_value::<PlanDay>(raw).is_err());
    }

    #[test]
    fn recipe_order_follows_days_then_slots() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut monday = day(date!(2024 - 06 - 03), MealType::Dinner, vec![c, a]);
        monday.meals.insert(MealType::Breakfast, MealSlot { recipe_ids: vec![a, b], participants: None });
        let tuesday = day(date!(2024 - 06 - 04), MealType::Lunch, vec![b]);
        assert_eq!(recipe_ids_in_order(&[monday, tuesday]), vec![a, b, c]);
    }

    #[test]
    fn slot_edit_freezes_participants_only_when_given() {
        let range = week();
        let mut days = normalize_days(&range, vec![]).unwrap();
        let r = Uuid::new_v4();
        apply_slot_edit(
            &range,
            &mut days,
            SlotEditRequest {
                date: date!(2024 - 06 - 03),
                meal_type: MealType::Breakfast,
                recipe_ids: Some(vec![r]),
                participants: None,
            },
        )
        .unwrap();
        let slot = &days[0].meals[&MealType::Breakfast];
        assert_eq!(slot.recipe_ids, vec![r]);
        assert_eq!(slot.participants, None);

        apply_slot_edit(
            &range,
            &mut days,
            SlotEditRequest {
                date: date!(2024 - 06 - 03),
                meal_type: MealType::Breakfast,
                recipe_ids: None,
                participants: Some(vec![]),
            },
        )
        .unwrap();
        let slot = &days[0].meals[&MealType::Breakfast];
        assert_eq!(slot.recipe_ids, vec![r]);
        assert_eq!(slot.participants, Some(vec![]));
    }

    #[test]
    fn slot_edit_outside_range_is_rejected() {
        let range = week();
        let mut days = normalize_days(&range, vec![]).unwrap();
        let err = apply_slot_edit(
            &range,
            &mut days,
            SlotEditRequest {
                date: date!(2024 - 06 - 11),
                meal_type: MealType::Dinner,
                recipe_ids: None,
                participants: None,
            },
        );
        assert!(err.is_err());
    }
}
