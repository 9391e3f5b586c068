use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::{AudioBackend, AudioHandle, AudioStatus};
use crate::errors::TourError;

/// Virtual player driven by the tokio clock.
///
/// Assets are registered with a length; playback advances with elapsed time
/// scaled by the rate. Nothing is decoded or sent to a device, which makes it
/// the backend of the terminal front end and of paused-clock tests.
#[derive(Debug, Default)]
pub struct SimulatedAudio {
    assets: Mutex<HashMap<String, u64>>,
    players: Mutex<HashMap<AudioHandle, SimulatedPlayer>>,
    next_handle: AtomicU64,
}

#[derive(Debug, Clone)]
struct SimulatedPlayer {
    asset: String,
    duration_ms: u64,
    /// Position at `started_at`, or the frozen position while paused.
    base_ms: u64,
    started_at: Option<Instant>,
    rate: f64,
    volume: f64,
    finish_reported: bool,
}

impl SimulatedPlayer {
    fn position_ms(&self, now: Instant) -> u64 {
        match self.started_at {
            Some(start) => {
                let elapsed = now.duration_since(start).as_secs_f64() * 1000.0 * self.rate;
                (self.base_ms + elapsed as u64).min(self.duration_ms)
            }
            None => self.base_ms,
        }
    }

    fn freeze(&mut self, now: Instant) {
        self.base_ms = self.position_ms(now);
        self.started_at = None;
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimulatedAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(self, asset: impl Into<String>, duration: Duration) -> Self {
        self.register_asset(asset, duration);
        self
    }

    pub fn register_asset(&self, asset: impl Into<String>, duration: Duration) {
        locked(&self.assets).insert(asset.into(), duration.as_millis() as u64);
    }

    /// Number of handles currently acquired and not released.
    pub fn open_handles(&self) -> usize {
        locked(&self.players).len()
    }

    /// Current volume of a live handle.
    pub fn volume(&self, handle: AudioHandle) -> Option<f64> {
        locked(&self.players).get(&handle).map(|p| p.volume)
    }

    fn with_player<R>(
        &self,
        handle: AudioHandle,
        operation: &str,
        f: impl FnOnce(&mut SimulatedPlayer, Instant) -> R,
    ) -> Result<R, TourError> {
        let mut players = locked(&self.players);
        let player = players
            .get_mut(&handle)
            .ok_or_else(|| TourError::audio_operation(operation, format!("{} is not loaded", handle)))?;
        Ok(f(player, Instant::now()))
    }
}

#[async_trait]
impl AudioBackend for SimulatedAudio {
    async fn acquire(&self, asset: &str) -> Result<AudioHandle, TourError> {
        let duration_ms = locked(&self.assets)
            .get(asset)
            .copied()
            .ok_or_else(|| TourError::audio_unavailable(asset, "asset is not bundled"))?;

        let handle = AudioHandle(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        locked(&self.players).insert(
            handle,
            SimulatedPlayer {
                asset: asset.to_string(),
                duration_ms,
                base_ms: 0,
                started_at: None,
                rate: 1.0,
                volume: 1.0,
                finish_reported: false,
            },
        );

        debug!(%handle, asset, duration_ms, "Simulated audio acquired");
        Ok(handle)
    }

    async fn play(&self, handle: AudioHandle) -> Result<(), TourError> {
        self.with_player(handle, "play", |player, now| {
            if player.started_at.is_some() {
                return;
            }
            // Playing a finished asset starts it over
            if player.base_ms >= player.duration_ms {
                player.base_ms = 0;
            }
            player.finish_reported = false;
            player.started_at = Some(now);
        })
    }

    async fn pause(&self, handle: AudioHandle) -> Result<(), TourError> {
        self.with_player(handle, "pause", |player, now| player.freeze(now))
    }

    async fn seek(&self, handle: AudioHandle, position_ms: u64) -> Result<(), TourError> {
        self.with_player(handle, "seek", |player, now| {
            player.base_ms = position_ms.min(player.duration_ms);
            player.finish_reported = false;
            if player.started_at.is_some() {
                player.started_at = Some(now);
            }
        })
    }

    async fn set_rate(&self, handle: AudioHandle, rate: f64) -> Result<(), TourError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(TourError::InvalidSpeed(rate));
        }
        self.with_player(handle, "set_rate", |player, now| {
            let playing = player.started_at.is_some();
            player.freeze(now);
            player.rate = rate;
            if playing {
                player.started_at = Some(now);
            }
        })
    }

    async fn set_volume(&self, handle: AudioHandle, volume: f64) -> Result<(), TourError> {
        self.with_player(handle, "set_volume", |player, _| {
            player.volume = volume.clamp(0.0, 1.0);
        })
    }

    async fn status(&self, handle: AudioHandle) -> Result<AudioStatus, TourError> {
        self.with_player(handle, "status", |player, now| {
            let position_ms = player.position_ms(now);
            let mut did_just_finish = false;

            if player.started_at.is_some() && position_ms >= player.duration_ms {
                player.freeze(now);
                if !player.finish_reported {
                    player.finish_reported = true;
                    did_just_finish = true;
                }
            }

            trace!(%handle, asset = %player.asset, position_ms, "Simulated status");
            AudioStatus {
                is_loaded: true,
                is_playing: player.started_at.is_some(),
                position_ms,
                duration_ms: Some(player.duration_ms),
                did_just_finish,
            }
        })
    }

    async fn release(&self, handle: AudioHandle) -> Result<(), TourError> {
        match locked(&self.players).remove(&handle) {
            Some(player) => {
                debug!(%handle, asset = %player.asset, "Simulated audio released");
                Ok(())
            }
            None => Err(TourError::audio_operation(
                "release",
                format!("{} is not loaded", handle),
            )),
        }
    }
}
