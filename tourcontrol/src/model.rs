use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoiId(pub String);

impl PoiId {
    pub fn new(id: impl Into<String>) -> Self {
        PoiId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PoiId {
    fn from(value: &str) -> Self {
        PoiId(value.to_string())
    }
}

impl From<String> for PoiId {
    fn from(value: String) -> Self {
        PoiId(value)
    }
}

/// Kind of attraction, drives the map marker color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Landmark,
    Sports,
    Attraction,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Landmark, Category::Sports, Category::Attraction];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Landmark => "landmark",
            Category::Sports => "sports",
            Category::Attraction => "attraction",
        }
    }

    pub fn marker_color(&self) -> MarkerColor {
        match self {
            Category::Landmark => MarkerColor::rgb(0xFF, 0x4B, 0x4B),
            Category::Sports => MarkerColor::rgb(0x4B, 0x7B, 0xFF),
            Category::Attraction => MarkerColor::rgb(0x4B, 0xFF, 0x4B),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MarkerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl MarkerColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        MarkerColor { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for MarkerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

/// WGS84 coordinate pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub id: PoiId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: String,
    pub category: Category,
    pub rating: f64,
    /// Opaque reference handed to the audio backend.
    pub audio_file: String,
    pub image: String,
    /// Display duration in minutes, e.g. "15".
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default)]
    pub featured: bool,
}

impl Poi {
    pub fn coordinates(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Leading integer of the display duration ("15", "15 min" -> 15).
    pub fn duration_minutes(&self) -> Option<u32> {
        let digits: String = self
            .duration
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
}

/// Notifications emitted by the selection/favorites store.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreEvent {
    SelectionChanged { poi_id: PoiId },
    FavoritesChanged { poi_id: PoiId, is_favorite: bool },
}

/// Notifications emitted by the playback controller.
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    LoadingChanged {
        poi_id: PoiId,
        loading: bool,
    },
    Loaded {
        poi_id: PoiId,
        duration_seconds: f64,
    },
    StateChanged {
        poi_id: PoiId,
        playing: bool,
    },
    PositionChanged {
        poi_id: PoiId,
        position_seconds: f64,
        progress: f64,
    },
    Finished {
        poi_id: PoiId,
    },
    SpeedChanged {
        speed: f64,
    },
    MuteChanged {
        muted: bool,
    },
    Error {
        poi_id: Option<PoiId>,
        message: String,
        retryable: bool,
    },
    Released,
}
