//! Distance to points of interest and proximity-based rebinding.

mod location;

use tracing::debug;

use crate::catalog::PoiCatalog;
use crate::model::{GeoPoint, Poi, PoiId};

pub use location::{LocationSource, SimulatedWalk};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres (haversine).
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

pub fn distance_between(a: GeoPoint, b: GeoPoint) -> f64 {
    distance_km(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Tracks which POI the listener is standing at.
#[derive(Clone, Debug, PartialEq)]
pub struct ProximityBinder {
    threshold_km: f64,
    active: Option<PoiId>,
}

impl ProximityBinder {
    pub fn new(threshold_km: f64) -> Self {
        Self {
            threshold_km,
            active: None,
        }
    }

    pub fn threshold_km(&self) -> f64 {
        self.threshold_km
    }

    pub fn active(&self) -> Option<&PoiId> {
        self.active.as_ref()
    }

    pub fn set_active(&mut self, id: Option<PoiId>) {
        self.active = id;
    }

    /// Makes `poi` the active one. Returns false when it already was.
    pub fn check_proximity(&mut self, poi: &Poi) -> bool {
        if self.active.as_ref() == Some(&poi.id) {
            return false;
        }
        debug!(poi = %poi.id, previous = ?self.active, "Proximity rebind");
        self.active = Some(poi.id.clone());
        true
    }

    /// Closest POI no farther than the threshold, with its distance.
    pub fn nearest_within<'a>(
        &self,
        catalog: &'a PoiCatalog,
        position: GeoPoint,
    ) -> Option<(&'a Poi, f64)> {
        catalog
            .iter()
            .map(|poi| (poi, distance_between(position, poi.coordinates())))
            .filter(|(_, distance)| *distance <= self.threshold_km)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Rebinds to the nearest POI in range, returning it when the binding changed.
    pub fn on_position<'a>(&mut self, catalog: &'a PoiCatalog, position: GeoPoint) -> Option<&'a Poi> {
        let (poi, _) = self.nearest_within(catalog, position)?;
        self.check_proximity(poi).then_some(poi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_cn_tower_to_rogers_centre() {
        let d = distance_km(43.6426, -79.3871, 43.6432, -79.3857);
        assert!(d > 0.1 && d < 0.2, "distance was {}", d);
    }

    #[test]
    fn test_distance_is_symmetric_and_zero_on_self() {
        let there = distance_km(43.6426, -79.3871, 43.6777, -79.4093);
        let back = distance_km(43.6777, -79.4093, 43.6426, -79.3871);
        assert!((there - back).abs() < 1e-9);
        assert_eq!(distance_km(43.6426, -79.3871, 43.6426, -79.3871), 0.0);
    }

    #[test]
    fn test_check_proximity_rebinds_once() {
        let catalog = PoiCatalog::toronto().unwrap();
        let tower = catalog.find("cn-tower").unwrap();
        let mut binder = ProximityBinder::new(0.05);

        assert!(binder.check_proximity(tower));
        assert!(!binder.check_proximity(tower));
        assert_eq!(binder.active(), Some(&tower.id));
    }

    #[test]
    fn test_nearest_within_threshold() {
        let catalog = PoiCatalog::toronto().unwrap();
        let binder = ProximityBinder::new(0.05);

        let (poi, distance) = binder
            .nearest_within(&catalog, GeoPoint::new(43.6427, -79.3870))
            .unwrap();
        assert_eq!(poi.id.as_str(), "cn-tower");
        assert!(distance < 0.05);

        // Lake Ontario, nowhere near a POI
        assert!(binder
            .nearest_within(&catalog, GeoPoint::new(43.62, -79.38))
            .is_none());
    }
}
