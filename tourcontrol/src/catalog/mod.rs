//! Static, read-only catalog of points of interest.
//!
//! The catalog is built once at startup, either from the embedded Toronto
//! dataset or from a YAML/JSON file, and is never mutated afterwards. Views
//! and the tour session share it behind an `Arc`.

mod summary;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::TourError;
use crate::model::{Category, Poi, PoiId};

pub use summary::CatalogSummary;

const TORONTO_CATALOG: &str = include_str!("toronto.yaml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    points: Vec<Poi>,
}

#[derive(Clone, Debug)]
pub struct PoiCatalog {
    pois: Vec<Poi>,
    index: HashMap<PoiId, usize>,
}

impl PoiCatalog {
    /// Builds a catalog, rejecting empty or duplicate ids and out-of-range coordinates.
    pub fn new(pois: Vec<Poi>) -> Result<Self, TourError> {
        let mut index = HashMap::with_capacity(pois.len());

        for (position, poi) in pois.iter().enumerate() {
            if poi.id.as_str().trim().is_empty() {
                return Err(TourError::catalog_error(format!(
                    "entry #{} has an empty id",
                    position
                )));
            }
            if !poi.coordinates().is_valid() {
                return Err(TourError::catalog_error(format!(
                    "{} has invalid coordinates ({}, {})",
                    poi.id, poi.latitude, poi.longitude
                )));
            }
            if index.insert(poi.id.clone(), position).is_some() {
                return Err(TourError::DuplicatePoi(poi.id.to_string()));
            }
        }

        debug!(count = pois.len(), "POI catalog built");
        Ok(Self { pois, index })
    }

    /// The bundled downtown Toronto dataset.
    pub fn toronto() -> Result<Self, TourError> {
        Self::from_yaml_str(TORONTO_CATALOG)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, TourError> {
        let file: CatalogFile =
            serde_yaml::from_str(yaml).map_err(TourError::catalog_error)?;
        Self::new(file.points)
    }

    pub fn from_json_str(json: &str) -> Result<Self, TourError> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(TourError::catalog_error)?;
        Self::new(file.points)
    }

    /// Loads a catalog file; `.json` files are parsed as JSON, anything else as YAML.
    pub fn load_file(path: &Path) -> Result<Self, TourError> {
        let content = fs::read_to_string(path).map_err(|e| {
            TourError::catalog_error(format!("cannot read {}: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let catalog = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_yaml_str(&content)?
        };

        info!(file = %path.display(), count = catalog.len(), "Loaded POI catalog");
        Ok(catalog)
    }

    pub fn get(&self, id: &PoiId) -> Option<&Poi> {
        self.index.get(id).map(|&i| &self.pois[i])
    }

    pub fn find(&self, id: &str) -> Option<&Poi> {
        self.get(&PoiId::new(id))
    }

    pub fn contains(&self, id: &PoiId) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Poi> {
        self.pois.iter()
    }

    pub fn len(&self) -> usize {
        self.pois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pois.is_empty()
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &Poi> {
        self.pois.iter().filter(move |poi| poi.category == category)
    }

    /// Places highlighted on the home view, in catalog order.
    pub fn featured(&self) -> Vec<&Poi> {
        self.pois.iter().filter(|poi| poi.featured).collect()
    }

    /// Favorited places in catalog order; ids missing from the catalog are skipped.
    pub fn favorites(&self, favorites: &[PoiId]) -> Vec<&Poi> {
        self.pois
            .iter()
            .filter(|poi| favorites.contains(&poi.id))
            .collect()
    }

    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary::of(self)
    }
}
