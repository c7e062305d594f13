//! Client-side toggle of an item's checked state.
//!
//! The toggle is applied to the local list at once, then persisted. A failed
//! persistence restores the previous state. Only one toggle may be in flight.

use std::future::Future;

use thiserror::Error;
use uuid::Uuid;

use super::aggregate::{sort_items, ShoppingItem};

#[derive(Debug, Error, PartialEq)]
pub enum ToggleError {
    #[error("another item is still being saved")]
    InFlight,
    #[error("item is not on the list")]
    UnknownItem,
    #[error("saving failed: {0}")]
    Persist(String),
}

/// Token for a toggle applied locally but not yet persisted.
#[derive(Debug)]
pub struct PendingToggle {
    ingredient_id: Uuid,
    previous: bool,
}

#[derive(Debug, Clone)]
pub struct OptimisticToggle {
    items: Vec<ShoppingItem>,
    in_flight: Option<Uuid>,
}

impl OptimisticToggle {
    pub fn new(items: Vec<ShoppingItem>) -> Self {
        Self { items, in_flight: None }
    }

    pub fn items(&self) -> &[ShoppingItem] {
        &self.items
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    fn item_mut(&mut self, ingredient_id: Uuid) -> Option<&mut ShoppingItem> {
        self.items.iter_mut().find(|i| i.ingredient_id == ingredient_id)
    }

    /// Flips the item locally and returns the item to persist.
    pub fn begin(&mut self, ingredient_id: Uuid) -> Result<(PendingToggle, ShoppingItem), ToggleError> {
        if self.in_flight.is_some() {
            return Err(ToggleError::InFlight);
        }
        let item = self.item_mut(ingredient_id).ok_or(ToggleError::UnknownItem)?;
        let previous = item.checked;
        item.checked = !previous;
        let snapshot = item.clone();
        self.in_flight = Some(ingredient_id);
        Ok((PendingToggle { ingredient_id, previous }, snapshot))
    }

    /// Settles a pending toggle. On success the persisted item replaces the
    /// local one (it now carries the override id); on failure the previous
    /// checked state is restored and the error returned.
    pub fn finish<E: std::fmt::Display>(
        &mut self,
        pending: PendingToggle,
        outcome: Result<ShoppingItem, E>,
    ) -> Result<(), ToggleError> {
        self.in_flight = None;
        match outcome {
            Ok(saved) => {
                if let Some(item) = self.item_mut(pending.ingredient_id) {
                    *item = saved;
                }
                sort_items(&mut self.items);
                Ok(())
            }
            Err(e) => {
                if let Some(item) = self.item_mut(pending.ingredient_id) {
                    item.checked = pending.previous;
                }
                Err(ToggleError::Persist(e.to_string()))
            }
        }
    }

    /// `begin`, run `persist`, then `finish`.
    pub async fn toggle<F, Fut, E>(&mut self, ingredient_id: Uuid, persist: F) -> Result<(), ToggleError>
    where
        F: FnOnce(ShoppingItem) -> Fut,
        Fut: Future<Output = Result<ShoppingItem, E>>,
        E: std::fmt::Display,
    {
        let (pending, item) = self.begin(ingredient_id)?;
        let outcome = persist(item).await;
        self.finish(pending, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> ShoppingItem {
        ShoppingItem {
            id: None,
            ingredient_id: Uuid::new_v4(),
            name: name.into(),
            quantity: None,
            unit: None,
            checked: false,
            recipe_ids: vec![],
        }
    }

    #[tokio::test]
    async fn successful_toggle_keeps_the_new_state_and_id() {
        let eggs = item("eggs");
        let mut list = OptimisticToggle::new(vec![eggs.clone(), item("milk")]);
        let saved_id = Uuid::new_v4();
        list.toggle(eggs.ingredient_id, |mut i| async move {
            assert!(i.checked);
            i.id = Some(saved_id);
            Ok::<_, String>(i)
        })
        .await
        .unwrap();

        let eggs_now = list.items().iter().find(|i| i.name == "eggs").unwrap();
        assert!(eggs_now.checked);
        assert_eq!(eggs_now.id, Some(saved_id));
        // checked items sort last
        assert_eq!(list.items()[1].name, "eggs");
        assert!(!list.is_busy());
    }

    #[tokio::test]
    async fn failed_toggle_reverts_and_surfaces_the_error() {
        let eggs = item("eggs");
        let mut list = OptimisticToggle::new(vec![eggs.clone()]);
        let err = list
            .toggle(eggs.ingredient_id, |_| async { Err::<ShoppingItem, _>("503 from server") })
            .await
            .unwrap_err();
        assert_eq!(err, ToggleError::Persist("503 from server".into()));
        assert!(!list.items()[0].checked);
        assert!(!list.is_busy());
    }

    #[test]
    fn second_toggle_while_in_flight_is_rejected() {
        let (a, b) = (item("a"), item("b"));
        let mut list = OptimisticToggle::new(vec![a.clone(), b.clone()]);
        let (pending, _) = list.begin(a.ingredient_id).unwrap();
        assert!(list.items()[0].checked);
        assert_eq!(list.begin(b.ingredient_id).unwrap_err(), ToggleError::InFlight);
        assert!(!list.items()[1].checked);

        list.finish(pending, Err("offline")).unwrap_err();
        assert!(!list.items()[0].checked);
        assert!(list.begin(b.ingredient_id).is_ok());
    }

    #[test]
    fn unknown_item_is_rejected() {
        let mut list = OptimisticToggle::new(vec![item("a")]);
        assert_eq!(list.begin(Uuid::new_v4()).unwrap_err(), ToggleError::UnknownItem);
        assert!(!list.is_busy());
    }
}
