use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::trace;

use crate::errors::TourError;
use crate::model::GeoPoint;

/// Provides the device position on demand.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Fails with [`TourError::LocationUnavailable`] when permission is denied
    /// or no fix can be obtained.
    async fn current_position(&self) -> Result<GeoPoint, TourError>;
}

/// Walks a fixed path, one point per request, wrapping at the end.
#[derive(Debug)]
pub struct SimulatedWalk {
    path: Vec<GeoPoint>,
    next: AtomicUsize,
}

impl SimulatedWalk {
    pub fn new(path: Vec<GeoPoint>) -> Self {
        Self {
            path,
            next: AtomicUsize::new(0),
        }
    }

    /// Loop from the CN Tower past Rogers Centre and Ripley's Aquarium.
    pub fn toronto() -> Self {
        Self::new(vec![
            GeoPoint::new(43.6426, -79.3871),
            GeoPoint::new(43.6428, -79.3863),
            GeoPoint::new(43.6432, -79.3857),
            GeoPoint::new(43.6424, -79.3860),
            GeoPoint::new(43.6442, -79.3874),
        ])
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

#[async_trait]
impl LocationSource for SimulatedWalk {
    async fn current_position(&self) -> Result<GeoPoint, TourError> {
        if self.path.is_empty() {
            return Err(TourError::LocationUnavailable(
                "simulated walk has no path".to_string(),
            ));
        }
        let step = self.next.fetch_add(1, Ordering::SeqCst) % self.path.len();
        let position = self.path[step];
        trace!(step, lat = position.latitude, lon = position.longitude, "Simulated fix");
        Ok(position)
    }
}
