use super::PoiCatalog;

/// Headline numbers shown on the home view.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogSummary {
    pub location_count: usize,
    /// Sum of the display durations that parse as minutes.
    pub total_audio_minutes: u64,
    /// `None` for an empty catalog.
    pub average_rating: Option<f64>,
}

impl CatalogSummary {
    pub fn of(catalog: &PoiCatalog) -> Self {
        let location_count = catalog.len();
        let total_audio_minutes = catalog
            .iter()
            .filter_map(|p| p.duration_minutes())
            .map(u64::from)
            .sum();
        let average_rating = if location_count == 0 {
            None
        } else {
            Some(catalog.iter().map(|p| p.rating).sum::<f64>() / location_count as f64)
        };

        Self {
            location_count,
            total_audio_minutes,
            average_rating,
        }
    }
}
