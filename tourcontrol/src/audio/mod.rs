//! Audio playback capability used by the tour player.
//!
//! Decoding and output belong to the platform media library; the player only
//! talks to it through [`AudioBackend`]. Every call is asynchronous and may
//! fail, which the player treats as a recoverable condition.

mod simulated;

use async_trait::async_trait;

use crate::errors::TourError;

pub use simulated::SimulatedAudio;

/// Opaque, exclusively owned reference to one loaded audio asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AudioHandle(pub u64);

impl std::fmt::Display for AudioHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "audio#{}", self.0)
    }
}

/// Status reported by the backend for a handle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioStatus {
    pub is_loaded: bool,
    pub is_playing: bool,
    pub position_ms: u64,
    /// `None` while the backend does not know the length yet.
    pub duration_ms: Option<u64>,
    /// True on the first status query after playback reached the end.
    pub did_just_finish: bool,
}

#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Loads the asset and returns a handle owning it.
    async fn acquire(&self, asset: &str) -> Result<AudioHandle, TourError>;

    /// Starts or resumes playback.
    async fn play(&self, handle: AudioHandle) -> Result<(), TourError>;

    async fn pause(&self, handle: AudioHandle) -> Result<(), TourError>;

    /// Moves the play head to an absolute position.
    async fn seek(&self, handle: AudioHandle, position_ms: u64) -> Result<(), TourError>;

    /// Playback rate, 1.0 being normal speed.
    async fn set_rate(&self, handle: AudioHandle, rate: f64) -> Result<(), TourError>;

    /// Volume between 0.0 (silent) and 1.0 (full).
    async fn set_volume(&self, handle: AudioHandle, volume: f64) -> Result<(), TourError>;

    async fn status(&self, handle: AudioHandle) -> Result<AudioStatus, TourError>;

    /// Frees the asset. The handle must not be used afterwards.
    async fn release(&self, handle: AudioHandle) -> Result<(), TourError>;
}
