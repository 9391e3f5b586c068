//! Core of the Toronto audio guide.
//!
//! - [`catalog`]: the read-only list of points of interest
//! - [`store`]: selected POI and favorites, with change notification
//! - [`playback`]: the tour player driving an [`audio::AudioBackend`]
//! - [`proximity`]: haversine distance and proximity rebinding
//! - [`tour`]: wiring of the above for a front end

pub mod audio;
pub mod catalog;
pub mod errors;
pub mod events;
pub mod model;
pub mod playback;
pub mod proximity;
pub mod store;
pub mod tour;

pub use audio::{AudioBackend, AudioHandle, AudioStatus, SimulatedAudio};
pub use catalog::{CatalogSummary, PoiCatalog};
pub use errors::TourError;
pub use events::{EventBus, PlaybackEventBus, StoreEventBus};
pub use model::{
    Category, GeoPoint, MarkerColor, PlaybackEvent, Poi, PoiId, StoreEvent,
};
pub use playback::{
    LoadOutcome, PlayPauseOutcome, PlaybackController, PlaybackSession, PlaybackSettings,
};
pub use proximity::{LocationSource, ProximityBinder, SimulatedWalk, distance_km};
pub use store::{StoreSnapshot, TourStore};
pub use tour::TourSession;
