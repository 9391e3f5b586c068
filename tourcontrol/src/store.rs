//! Selection and favorites state shared by every view.
//!
//! `TourStore` is constructed explicitly and handed to whoever needs it;
//! clones share the same state. All writes come from the front end's single
//! command loop, and subscribers are notified synchronously on the writer's
//! thread once the state lock has been released.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::Receiver;
use tracing::debug;

use crate::events::StoreEventBus;
use crate::model::{PoiId, StoreEvent};

/// Point-in-time copy of the store contents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoreSnapshot {
    pub selected_poi_id: Option<PoiId>,
    /// Insertion order, no duplicates.
    pub favorites: Vec<PoiId>,
}

#[derive(Clone, Default)]
pub struct TourStore {
    state: Arc<Mutex<StoreSnapshot>>,
    event_bus: StoreEventBus,
}

impl std::fmt::Debug for TourStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TourStore")
            .field("state", &*self.state())
            .field("subscribers", &self.event_bus.subscriber_count())
            .finish()
    }
}

impl TourStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Selects a POI. The id is not checked against the catalog.
    pub fn set_selected_poi_id(&self, id: impl Into<PoiId>) {
        let poi_id = id.into();
        self.state().selected_poi_id = Some(poi_id.clone());
        debug!(poi = %poi_id, "Selected POI updated");
        self.event_bus
            .broadcast(StoreEvent::SelectionChanged { poi_id });
    }

    /// Adds the id to the favorites if absent, removes it otherwise.
    ///
    /// Returns whether the id is a favorite after the call.
    pub fn toggle_favorite(&self, id: impl Into<PoiId>) -> bool {
        let poi_id = id.into();
        let is_favorite = {
            let mut state = self.state();
            if let Some(position) = state.favorites.iter().position(|f| f == &poi_id) {
                state.favorites.remove(position);
                false
            } else {
                state.favorites.push(poi_id.clone());
                true
            }
        };

        debug!(poi = %poi_id, is_favorite, "Favorites updated");
        self.event_bus.broadcast(StoreEvent::FavoritesChanged {
            poi_id,
            is_favorite,
        });
        is_favorite
    }

    pub fn selected_poi_id(&self) -> Option<PoiId> {
        self.state().selected_poi_id.clone()
    }

    pub fn favorites(&self) -> Vec<PoiId> {
        self.state().favorites.clone()
    }

    pub fn is_favorite(&self, id: &PoiId) -> bool {
        self.state().favorites.contains(id)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.state().clone()
    }

    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        self.event_bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_empty() {
        let store = TourStore::new();
        assert_eq!(store.snapshot(), StoreSnapshot::default());
    }

    #[test]
    fn test_toggle_keeps_insertion_order() {
        let store = TourStore::new();
        store.toggle_favorite("b");
        store.toggle_favorite("a");
        store.toggle_favorite("c");
        store.toggle_favorite("a");

        assert_eq!(store.favorites(), vec![PoiId::new("b"), PoiId::new("c")]);
    }

    #[test]
    fn test_clones_share_state() {
        let store = TourStore::new();
        let view = store.clone();
        store.set_selected_poi_id("casa-loma");
        assert_eq!(view.selected_poi_id(), Some(PoiId::new("casa-loma")));
    }
}
