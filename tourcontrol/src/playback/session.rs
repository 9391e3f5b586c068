use crate::model::{Poi, PoiId};

/// Player state for the bound POI.
///
/// `progress_fraction` is only ever derived from position and duration.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackSession {
    pub bound_poi: Option<PoiId>,
    /// Audio reference of the bound POI, kept so a failed load can be retried.
    pub audio_file: Option<String>,
    pub is_loading: bool,
    pub is_playing: bool,
    pub is_muted: bool,
    pub duration_seconds: f64,
    pub position_seconds: f64,
    pub progress_fraction: f64,
    pub speed_multiplier: f64,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new(false)
    }
}

impl PlaybackSession {
    pub fn new(muted: bool) -> Self {
        Self {
            bound_poi: None,
            audio_file: None,
            is_loading: false,
            is_playing: false,
            is_muted: muted,
            duration_seconds: 0.0,
            position_seconds: 0.0,
            progress_fraction: 0.0,
            speed_multiplier: 1.0,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound_poi.is_some()
    }

    pub fn is_bound_to(&self, id: &PoiId) -> bool {
        self.bound_poi.as_ref() == Some(id)
    }

    pub(crate) fn bind(&mut self, poi: &Poi) {
        self.bind_asset(poi.id.clone(), poi.audio_file.clone());
    }

    pub(crate) fn bind_asset(&mut self, id: PoiId, audio_file: String) {
        self.bound_poi = Some(id);
        self.audio_file = Some(audio_file);
        self.is_loading = true;
        self.is_playing = false;
        self.duration_seconds = 0.0;
        self.set_position(0.0);
    }

    pub(crate) fn set_duration(&mut self, seconds: f64) {
        self.duration_seconds = if seconds.is_finite() && seconds > 0.0 {
            seconds
        } else {
            0.0
        };
        self.set_position(self.position_seconds);
    }

    /// Stores the position clamped to the known duration and recomputes progress.
    pub(crate) fn set_position(&mut self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds } else { 0.0 };
        self.position_seconds = seconds.clamp(0.0, self.duration_seconds);
        self.progress_fraction = if self.duration_seconds > 0.0 {
            (self.position_seconds / self.duration_seconds).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// Forgets the bound POI. Speed and mute are listener preferences and survive.
    pub(crate) fn clear(&mut self) {
        *self = Self {
            is_muted: self.is_muted,
            speed_multiplier: self.speed_multiplier,
            ..Self::new(false)
        };
    }
}
