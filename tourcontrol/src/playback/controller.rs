//! Transport control for the audio of the active POI.
//!
//! The controller owns at most one [`AudioHandle`]. Every backend call goes
//! through the handle slot (`tokio::sync::Mutex`), so a load, a release and
//! transport calls on the same handle never interleave. Session state sits
//! behind a plain mutex that is never held across an `.await`.
//!
//! Each `load` and `release` starts a new generation. Completions and polling
//! ticks that belong to an older generation are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::Receiver;
use tracing::{debug, error, info, trace, warn};

use super::session::PlaybackSession;
use super::time_utils::{ms_to_seconds, seconds_to_ms};
use super::watcher::{PollerGuard, watch_position};
use crate::audio::{AudioBackend, AudioHandle};
use crate::errors::TourError;
use crate::events::PlaybackEventBus;
use crate::model::{PlaybackEvent, Poi, PoiId};

const FULL_VOLUME: f64 = 1.0;
const SILENT: f64 = 0.0;

#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackSettings {
    pub poll_interval: Duration,
    /// Step used by the forward and rewind buttons.
    pub skip_seconds: f64,
    /// Values walked by `cycle_speed`.
    pub speeds: Vec<f64>,
    pub start_muted: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            skip_seconds: 10.0,
            speeds: vec![1.0, 2.0],
            start_muted: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LoadOutcome {
    Loaded { duration_seconds: f64 },
    /// A newer load or a release happened while this one was in flight.
    Superseded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayPauseOutcome {
    /// Nothing was loaded: the audio was loaded but not started.
    Loaded,
    Playing,
    Paused,
}

#[derive(Clone)]
pub struct PlaybackController {
    shared: Arc<ControllerShared>,
}

pub(crate) struct ControllerShared {
    backend: Arc<dyn AudioBackend>,
    settings: PlaybackSettings,
    session: Mutex<PlaybackSession>,
    handle: tokio::sync::Mutex<Option<AudioHandle>>,
    poller: Mutex<Option<PollerGuard>>,
    generation: AtomicU64,
    next_poller_id: AtomicU64,
    events: PlaybackEventBus,
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("session", &*self.shared.session())
            .field("generation", &self.shared.current_generation())
            .finish()
    }
}

impl PlaybackController {
    pub fn new(backend: Arc<dyn AudioBackend>, settings: PlaybackSettings) -> Self {
        let session = PlaybackSession::new(settings.start_muted);
        Self {
            shared: Arc::new(ControllerShared {
                backend,
                settings,
                session: Mutex::new(session),
                handle: tokio::sync::Mutex::new(None),
                poller: Mutex::new(None),
                generation: AtomicU64::new(0),
                next_poller_id: AtomicU64::new(0),
                events: PlaybackEventBus::new(),
            }),
        }
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.shared.settings
    }

    pub fn snapshot(&self) -> PlaybackSession {
        self.shared.session().clone()
    }

    pub fn subscribe(&self) -> Receiver<PlaybackEvent> {
        self.shared.events.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.shared.poller().is_some()
    }

    /// Handle currently owned by the controller.
    pub async fn audio_handle(&self) -> Option<AudioHandle> {
        *self.shared.handle.lock().await
    }

    /// Binds `poi` and loads its audio, releasing whatever was loaded before.
    pub async fn load(&self, poi: &Poi) -> Result<LoadOutcome, TourError> {
        self.load_asset(poi.id.clone(), poi.audio_file.clone())
            .await
    }

    async fn load_asset(&self, poi_id: PoiId, audio_file: String) -> Result<LoadOutcome, TourError> {
        let shared = &self.shared;
        let generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        shared.stop_polling();
        shared.session().bind_asset(poi_id.clone(), audio_file.clone());
        shared.events.broadcast(PlaybackEvent::LoadingChanged {
            poi_id: poi_id.clone(),
            loading: true,
        });
        debug!(poi = %poi_id, asset = %audio_file, generation, "Loading audio");

        let mut slot = shared.handle.lock().await;
        if shared.is_stale(generation) {
            debug!(poi = %poi_id, generation, "Load superseded before acquisition");
            return Ok(LoadOutcome::Superseded);
        }

        if let Some(previous) = slot.take() {
            if let Err(e) = shared.backend.release(previous).await {
                warn!(handle = %previous, error = %e, "Failed to release previous audio");
            }
        }

        let handle = match shared.backend.acquire(&audio_file).await {
            Ok(handle) => handle,
            Err(e) => {
                if shared.is_stale(generation) {
                    return Ok(LoadOutcome::Superseded);
                }
                shared.session().is_loading = false;
                shared.events.broadcast(PlaybackEvent::LoadingChanged {
                    poi_id,
                    loading: false,
                });
                return Err(shared.report("load", e));
            }
        };

        if shared.is_stale(generation) {
            debug!(poi = %poi_id, %handle, "Discarding superseded audio");
            if let Err(e) = shared.backend.release(handle).await {
                warn!(%handle, error = %e, "Failed to release superseded audio");
            }
            return Ok(LoadOutcome::Superseded);
        }

        let muted = shared.session().is_muted;
        if muted {
            if let Err(e) = shared.backend.set_volume(handle, SILENT).await {
                warn!(poi = %poi_id, error = %e, "Failed to mute freshly loaded audio");
            }
        }

        let duration_seconds = match shared.backend.status(handle).await {
            Ok(status) => status.duration_ms.map(ms_to_seconds).unwrap_or(0.0),
            Err(e) => {
                warn!(poi = %poi_id, error = %e, "Duration unavailable after load");
                0.0
            }
        };

        *slot = Some(handle);
        {
            let mut session = shared.session();
            session.is_loading = false;
            session.set_duration(duration_seconds);
        }
        drop(slot);

        shared.events.broadcast(PlaybackEvent::LoadingChanged {
            poi_id: poi_id.clone(),
            loading: false,
        });
        shared.events.broadcast(PlaybackEvent::Loaded {
            poi_id: poi_id.clone(),
            duration_seconds,
        });
        info!(poi = %poi_id, %handle, duration_seconds, "Audio loaded");

        Ok(LoadOutcome::Loaded { duration_seconds })
    }

    /// Toggles between playing and paused.
    ///
    /// With no audio loaded this only loads the bound POI; playback starts on
    /// the next call.
    pub async fn play_pause(&self) -> Result<PlayPauseOutcome, TourError> {
        let shared = &self.shared;
        let slot = shared.handle.lock().await;

        let Some(handle) = *slot else {
            drop(slot);
            let bound = {
                let session = shared.session();
                session.bound_poi.clone().zip(session.audio_file.clone())
            };
            let (poi_id, audio_file) = bound.ok_or(TourError::NoActivePoi)?;
            self.load_asset(poi_id, audio_file).await?;
            return Ok(PlayPauseOutcome::Loaded);
        };

        let (playing, speed) = {
            let session = shared.session();
            (session.is_playing, session.speed_multiplier)
        };

        if playing {
            shared
                .backend
                .pause(handle)
                .await
                .map_err(|e| shared.report("pause", e))?;
            shared.stop_polling();
            shared.set_playing(false);
            drop(slot);
            debug!(%handle, "Playback paused");
            Ok(PlayPauseOutcome::Paused)
        } else {
            shared
                .backend
                .set_rate(handle, speed)
                .await
                .map_err(|e| shared.report("set_rate", e))?;
            shared
                .backend
                .play(handle)
                .await
                .map_err(|e| shared.report("play", e))?;
            shared.set_playing(true);
            drop(slot);
            self.start_polling();
            debug!(%handle, speed, "Playback started");
            Ok(PlayPauseOutcome::Playing)
        }
    }

    /// Seeks to `fraction` of the duration and returns the new position in seconds.
    ///
    /// Fractions outside `[0, 1]` are clamped.
    pub async fn seek(&self, fraction: f64) -> Result<f64, TourError> {
        if fraction.is_nan() {
            return Err(TourError::InvalidFraction(fraction));
        }
        let fraction = fraction.clamp(0.0, 1.0);
        let duration = self.shared.session().duration_seconds;
        self.seek_to(fraction * duration, "seek").await
    }

    /// Moves the play head by `delta_seconds`, staying within the audio.
    pub async fn skip(&self, delta_seconds: f64) -> Result<f64, TourError> {
        if !delta_seconds.is_finite() {
            return Err(TourError::InvalidSkip(delta_seconds));
        }

        let handle = self
            .audio_handle()
            .await
            .ok_or(TourError::NoActiveAudio)?;
        let reported = match self.shared.backend.status(handle).await {
            Ok(status) => Some(ms_to_seconds(status.position_ms)),
            Err(e) => {
                warn!(%handle, error = %e, "Position unavailable, using last known one");
                None
            }
        };
        let current = reported.unwrap_or_else(|| self.shared.session().position_seconds);

        let duration = self.shared.session().duration_seconds;
        let target = (current + delta_seconds).clamp(0.0, duration);
        self.seek_to(target, "skip").await
    }

    async fn seek_to(&self, seconds: f64, operation: &str) -> Result<f64, TourError> {
        let shared = &self.shared;
        let slot = shared.handle.lock().await;
        let handle = (*slot).ok_or(TourError::NoActiveAudio)?;

        shared
            .backend
            .seek(handle, seconds_to_ms(seconds))
            .await
            .map_err(|e| shared.report(operation, e))?;
        drop(slot);

        let (poi_id, position_seconds, progress) = {
            let mut session = shared.session();
            session.set_position(seconds);
            (
                session.bound_poi.clone(),
                session.position_seconds,
                session.progress_fraction,
            )
        };
        if let Some(poi_id) = poi_id {
            shared.events.broadcast(PlaybackEvent::PositionChanged {
                poi_id,
                position_seconds,
                progress,
            });
        }
        trace!(%handle, position_seconds, operation, "Position moved");
        Ok(position_seconds)
    }

    /// Sets the playback rate. Any positive finite multiplier is accepted.
    pub async fn set_speed(&self, multiplier: f64) -> Result<(), TourError> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(TourError::InvalidSpeed(multiplier));
        }

        let shared = &self.shared;
        let slot = shared.handle.lock().await;
        if let Some(handle) = *slot {
            shared
                .backend
                .set_rate(handle, multiplier)
                .await
                .map_err(|e| shared.report("set_rate", e))?;
        }
        drop(slot);

        shared.session().speed_multiplier = multiplier;
        shared
            .events
            .broadcast(PlaybackEvent::SpeedChanged { speed: multiplier });
        debug!(speed = multiplier, "Playback speed changed");
        Ok(())
    }

    /// Moves to the next configured speed, wrapping around, and returns it.
    pub async fn cycle_speed(&self) -> Result<f64, TourError> {
        let current = self.shared.session().speed_multiplier;
        let next = next_speed(&self.shared.settings.speeds, current);
        self.set_speed(next).await?;
        Ok(next)
    }

    /// Flips mute and returns the new state.
    pub async fn toggle_mute(&self) -> Result<bool, TourError> {
        let shared = &self.shared;
        let slot = shared.handle.lock().await;
        let muted = !shared.session().is_muted;

        if let Some(handle) = *slot {
            let volume = if muted { SILENT } else { FULL_VOLUME };
            shared
                .backend
                .set_volume(handle, volume)
                .await
                .map_err(|e| shared.report("set_volume", e))?;
        }
        drop(slot);

        shared.session().is_muted = muted;
        shared.events.broadcast(PlaybackEvent::MuteChanged { muted });
        debug!(muted, "Mute toggled");
        Ok(muted)
    }

    /// Stops polling, frees the handle and forgets the bound POI.
    ///
    /// A load started after this call wins: once it has taken over, the
    /// release leaves the handle slot and the session to it.
    pub async fn release(&self) -> Result<(), TourError> {
        let shared = &self.shared;
        let generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        shared.stop_polling();

        let mut slot = shared.handle.lock().await;
        if shared.is_stale(generation) {
            // The newer load releases whatever handle is still in the slot
            debug!(generation, "Release overtaken by a newer load");
            return Ok(());
        }

        let result = match slot.take() {
            Some(handle) => {
                let result = shared.backend.release(handle).await;
                debug!(%handle, "Audio released");
                result
            }
            None => Ok(()),
        };
        drop(slot);

        // Checked under the session lock so a load binding right now survives
        let cleared = {
            let mut session = shared.session();
            let current = !shared.is_stale(generation);
            if current {
                session.clear();
            }
            current
        };
        if cleared {
            shared.events.broadcast(PlaybackEvent::Released);
        }
        result.map_err(|e| shared.report("release", e))
    }

    fn start_polling(&self) {
        let shared = &self.shared;
        let id = shared.next_poller_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (guard, token) = PollerGuard::new(id);
        if let Some(previous) = shared.poller().replace(guard) {
            trace!(poller_id = previous.id, "Replacing position poller");
        }

        tokio::spawn(watch_position(
            Arc::downgrade(shared),
            id,
            shared.current_generation(),
            token,
            shared.settings.poll_interval,
        ));
        trace!(poller_id = id, "Position polling started");
    }
}

fn next_speed(speeds: &[f64], current: f64) -> f64 {
    let steps: Vec<f64> = speeds
        .iter()
        .copied()
        .filter(|s| s.is_finite() && *s > 0.0)
        .collect();
    if steps.is_empty() {
        return 1.0;
    }

    match steps.iter().position(|s| (s - current).abs() < f64::EPSILON) {
        Some(i) => steps[(i + 1) % steps.len()],
        None => steps[0],
    }
}

impl ControllerShared {
    fn session(&self) -> MutexGuard<'_, PlaybackSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn poller(&self) -> MutexGuard<'_, Option<PollerGuard>> {
        self.poller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.current_generation() != generation
    }

    /// Cancels the polling task, if any.
    fn stop_polling(&self) {
        if let Some(guard) = self.poller().take() {
            trace!(poller_id = guard.id, "Cancelling position poller");
        }
    }

    fn stop_polling_if(&self, poller_id: u64) {
        let mut poller = self.poller();
        if poller.as_ref().is_some_and(|g| g.id == poller_id) {
            poller.take();
        }
    }

    fn is_current_poller(&self, poller_id: u64) -> bool {
        self.poller().as_ref().is_some_and(|g| g.id == poller_id)
    }

    fn set_playing(&self, playing: bool) {
        let poi_id = {
            let mut session = self.session();
            session.is_playing = playing;
            session.bound_poi.clone()
        };
        if let Some(poi_id) = poi_id {
            self.events
                .broadcast(PlaybackEvent::StateChanged { poi_id, playing });
        }
    }

    /// Logs a backend failure and publishes it to subscribers.
    fn report(&self, operation: &str, err: TourError) -> TourError {
        let poi_id = self.session().bound_poi.clone();
        error!(
            poi = ?poi_id,
            operation,
            error = %err,
            retryable = err.is_retryable(),
            "Playback operation failed"
        );
        self.events.broadcast(PlaybackEvent::Error {
            poi_id,
            message: err.to_string(),
            retryable: err.is_retryable(),
        });
        err
    }

    /// One polling tick. Returns false when polling should stop.
    pub(crate) async fn poll_once(&self, poller_id: u64, generation: u64) -> bool {
        if self.is_stale(generation) || !self.is_current_poller(poller_id) {
            return false;
        }

        let slot = self.handle.lock().await;
        let Some(handle) = *slot else {
            return false;
        };
        let status = match self.backend.status(handle).await {
            Ok(status) => status,
            Err(e) => {
                warn!(%handle, error = %e, "Position poll failed");
                return true;
            }
        };
        drop(slot);

        // Paused, reloaded or released while the status was in flight
        if self.is_stale(generation) || !self.is_current_poller(poller_id) {
            return false;
        }

        if status.did_just_finish {
            self.stop_polling_if(poller_id);
            let poi_id = {
                let mut session = self.session();
                session.is_playing = false;
                session.set_position(0.0);
                session.bound_poi.clone()
            };
            if let Some(poi_id) = poi_id {
                info!(poi = %poi_id, "Narration finished");
                self.events.broadcast(PlaybackEvent::StateChanged {
                    poi_id: poi_id.clone(),
                    playing: false,
                });
                self.events.broadcast(PlaybackEvent::PositionChanged {
                    poi_id: poi_id.clone(),
                    position_seconds: 0.0,
                    progress: 0.0,
                });
                self.events.broadcast(PlaybackEvent::Finished { poi_id });
            }
            return false;
        }

        let changed = {
            let mut session = self.session();
            if let Some(duration_ms) = status.duration_ms.filter(|d| *d > 0) {
                session.set_duration(ms_to_seconds(duration_ms));
            }
            let before = session.position_seconds;
            session.set_position(ms_to_seconds(status.position_ms));
            (session.position_seconds != before).then(|| {
                (
                    session.bound_poi.clone(),
                    session.position_seconds,
                    session.progress_fraction,
                )
            })
        };

        if let Some((Some(poi_id), position_seconds, progress)) = changed {
            self.events.broadcast(PlaybackEvent::PositionChanged {
                poi_id,
                position_seconds,
                progress,
            });
        }
        true
    }
}

impl Drop for ControllerShared {
    fn drop(&mut self) {
        self.stop_polling();

        let Some(handle) = self.handle.get_mut().take() else {
            return;
        };
        let backend = Arc::clone(&self.backend);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = backend.release(handle).await {
                        warn!(%handle, error = %e, "Failed to release audio on teardown");
                    }
                });
            }
            Err(_) => {
                warn!(%handle, "No runtime to release audio on teardown");
            }
        }
    }
}
