//! Read-time participant expansion.
//!
//! A slot that was never edited stores no participant list and is shown with
//! every current non-guest member, so members added later join it too. An
//! edited slot keeps exactly its stored list, minus members that no longer
//! exist.

use std::collections::{BTreeMap, HashSet};

use uuid::Uuid;

use super::dto::{DayView, MealSlot, MealType, PlanDay, SlotView};

/// The part of a family member participant expansion needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub id: Uuid,
    pub is_guest: bool,
}

/// Participants of one slot given whether it was edited (`stored` is `Some`).
pub fn effective_participants(stored: Option<&[Uuid]>, members: &[MemberSnapshot]) -> Vec<Uuid> {
    match stored {
        None => members.iter().filter(|m| !m.is_guest).map(|m| m.id).collect(),
        Some(list) => {
            let known: HashSet<Uuid> = members.iter().map(|m| m.id).collect();
            list.iter().copied().filter(|id| known.contains(id)).collect()
        }
    }
}

fn slot_view(slot: Option<&MealSlot>, members: &[MemberSnapshot]) -> SlotView {
    let stored = slot.and_then(|s| s.participants.as_deref());
    SlotView {
        recipe_ids: slot.map(|s| s.recipe_ids.clone()).unwrap_or_default(),
        participants: effective_participants(stored, members),
        participants_edited: stored.is_some(),
    }
}

/// Full view of the stored days: every meal type is present on every day.
pub fn expand(days: &[PlanDay], members: &[MemberSnapshot]) -> Vec<DayView> {
    days.iter()
        .map(|day| DayView {
            date: day.date,
            meals: MealType::ALL
                .iter()
                .map(|mt| (*mt, slot_view(day.meals.get(mt), members)))
                .collect::<BTreeMap<_, _>>(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn member(is_guest: bool) -> MemberSnapshot {
        MemberSnapshot { id: Uuid::new_v4(), is_guest }
    }

    fn day_with(slot: MealSlot) -> PlanDay {
        let mut day = PlanDay::empty(date!(2024 - 06 - 03));
        day.meals.insert(MealType::Breakfast, slot);
        day
    }

    #[test]
    fn unedited_slot_defaults_to_non_guest_members() {
        let (parent, guest) = (member(false), member(true));
        let got = effective_participants(None, &[parent, guest]);
        assert_eq!(got, vec![parent.id]);
    }

    #[test]
    fn new_member_joins_unedited_but_not_edited_slots() {
        let parent = member(false);
        let edited = day_with(MealSlot {
            recipe_ids: vec![],
            participants: Some(vec![parent.id]),
        });
        let unedited = day_with(MealSlot::default());

        let newcomer = member(false);
        let members = [parent, newcomer];

        let view = expand(&[unedited], &members);
        let slot = &view[0].meals[&MealType::Breakfast];
        assert_eq!(slot.participants, vec![parent.id, newcomer.id]);
        assert!(!slot.participants_edited);

        let view = expand(&[edited], &members);
        let slot = &view[0].meals[&MealType::Breakfast];
        assert_eq!(slot.participants, vec![parent.id]);
        assert!(slot.participants_edited);
    }

    #[test]
    fn explicit_guest_is_kept_and_removed_members_dropped() {
        let guest = member(true);
        let gone = Uuid::new_v4();
        let got = effective_participants(Some(&[guest.id, gone][..]), &[guest]);
        assert_eq!(got, vec![guest.id]);
    }

    #[test]
    fn explicit_empty_list_stays_empty() {
        let got = effective_participants(Some(&[][..]), &[member(false)]);
        assert!(got.is_empty());
    }

    #[test]
    fn every_meal_type_is_shown() {
        let view = expand(&[PlanDay::empty(date!(2024 - 06 - 04))], &[member(false)]);
        assert_eq!(view[0].meals.len(), 3);
        assert!(view[0].meals[&MealType::Dinner].recipe_ids.is_empty());
        assert_eq!(view[0].meals[&MealType::Dinner].participants.len(), 1);
    }

    #[test]
    fn expansion_is_not_written_back() {
        let days = vec![day_with(MealSlot::default())];
        let _ = expand(&days, &[member(false)]);
        assert_eq!(days[0].meals[&MealType::Breakfast].participants, None);
    }
}
