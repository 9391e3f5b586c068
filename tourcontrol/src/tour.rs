//! Glue between the store, the catalog, the player and proximity binding.
//!
//! The store's selection drives which POI the player is bound to. A proximity
//! rebind goes through the store as well, so every view sees the same active
//! POI.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog::PoiCatalog;
use crate::errors::TourError;
use crate::model::{GeoPoint, Poi, PoiId, StoreEvent};
use crate::playback::{LoadOutcome, PlaybackController};
use crate::proximity::{LocationSource, ProximityBinder};
use crate::store::TourStore;

#[derive(Debug)]
pub struct TourSession {
    catalog: Arc<PoiCatalog>,
    store: TourStore,
    controller: PlaybackController,
    binder: ProximityBinder,
}

impl TourSession {
    pub fn new(
        catalog: Arc<PoiCatalog>,
        store: TourStore,
        controller: PlaybackController,
        proximity_threshold_km: f64,
    ) -> Self {
        Self {
            catalog,
            store,
            controller,
            binder: ProximityBinder::new(proximity_threshold_km),
        }
    }

    pub fn catalog(&self) -> &PoiCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &TourStore {
        &self.store
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn active_poi(&self) -> Option<&Poi> {
        self.binder.active().and_then(|id| self.catalog.get(id))
    }

    /// Reacts to a store notification. Only selection changes matter here.
    pub async fn on_store_event(
        &mut self,
        event: &StoreEvent,
    ) -> Result<Option<LoadOutcome>, TourError> {
        match event {
            StoreEvent::SelectionChanged { poi_id } => self.activate(poi_id).await,
            StoreEvent::FavoritesChanged { .. } => Ok(None),
        }
    }

    /// Binds the player to the store's current selection, if any.
    pub async fn sync_selection(&mut self) -> Result<Option<LoadOutcome>, TourError> {
        match self.store.selected_poi_id() {
            Some(poi_id) => self.activate(&poi_id).await,
            None => Ok(None),
        }
    }

    async fn activate(&mut self, poi_id: &PoiId) -> Result<Option<LoadOutcome>, TourError> {
        let Some(poi) = self.catalog.get(poi_id).cloned() else {
            warn!(poi = %poi_id, "Selected POI is not in the catalog");
            return Err(TourError::UnknownPoi(poi_id.to_string()));
        };

        if self.binder.active() == Some(poi_id) && self.controller.snapshot().is_bound_to(poi_id) {
            debug!(poi = %poi_id, "POI already active");
            return Ok(None);
        }

        self.binder.set_active(Some(poi.id.clone()));
        info!(poi = %poi.id, name = %poi.name, "Activating POI");
        let outcome = self.controller.load(&poi).await?;

        if self.store.selected_poi_id().as_ref() != Some(poi_id) {
            debug!(poi = %poi_id, "Selection moved on during load");
            return Ok(Some(LoadOutcome::Superseded));
        }
        Ok(Some(outcome))
    }

    /// Leaves the player: pauses if needed, frees the audio and clears the active POI.
    pub async fn back(&mut self) -> Result<(), TourError> {
        if self.controller.snapshot().is_playing {
            let outcome = self.controller.play_pause().await?;
            debug!(?outcome, "Paused on back");
        }
        self.binder.set_active(None);
        self.controller.release().await
    }

    /// Toggles the active POI in the favorites and returns its new membership.
    pub fn toggle_active_favorite(&self) -> Result<bool, TourError> {
        let poi_id = self.binder.active().cloned().ok_or(TourError::NoActivePoi)?;
        Ok(self.store.toggle_favorite(poi_id))
    }

    /// Proximity binding for one location fix.
    ///
    /// Returns the POI the player was rebound to, if the fix changed it.
    pub async fn on_location(&mut self, position: GeoPoint) -> Result<Option<PoiId>, TourError> {
        let Some(poi) = self.binder.on_position(&self.catalog, position).cloned() else {
            return Ok(None);
        };

        info!(poi = %poi.id, lat = position.latitude, lon = position.longitude, "Arrived near POI");
        self.store.set_selected_poi_id(poi.id.clone());
        self.controller.load(&poi).await?;
        Ok(Some(poi.id))
    }

    /// Reads one fix from `source` and applies proximity binding.
    pub async fn step_location(
        &mut self,
        source: &dyn LocationSource,
    ) -> Result<Option<PoiId>, TourError> {
        let position = source.current_position().await.map_err(|e| {
            warn!(error = %e, "Location unavailable");
            e
        })?;
        self.on_location(position).await
    }
}
