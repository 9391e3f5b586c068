#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tourcontrol::{
    AudioBackend, AudioHandle, AudioStatus, Category, PlaybackController, PlaybackSettings, Poi,
    PoiId, TourError,
};

#[derive(Clone, Debug, Default)]
struct MockPlayer {
    duration_ms: u64,
    position_ms: u64,
    playing: bool,
    volume: f64,
    rate: f64,
}

/// Backend that counts open handles and panics when a second one is acquired
/// while the first is still open.
#[derive(Default)]
pub struct CountingAudio {
    assets: Mutex<HashMap<String, u64>>,
    players: Mutex<HashMap<AudioHandle, MockPlayer>>,
    next_handle: AtomicU64,
    acquired: AtomicUsize,
    released: AtomicUsize,
    failing_acquires: AtomicUsize,
    failing_operations: Mutex<HashSet<String>>,
    acquire_delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl CountingAudio {
    pub fn new() -> Arc<Self> {
        let audio = Self::default();
        audio.add_asset("audio/cn-tower.mp3", 900_000);
        audio.add_asset("audio/rogers-centre.mp3", 600_000);
        audio.add_asset("audio/ripleys-aquarium.mp3", 1_200_000);
        Arc::new(audio)
    }

    pub fn add_asset(&self, asset: &str, duration_ms: u64) {
        self.assets
            .lock()
            .unwrap()
            .insert(asset.to_string(), duration_ms);
    }

    /// The next `count` acquisitions fail as if the asset were unavailable.
    pub fn fail_next_acquires(&self, count: usize) {
        self.failing_acquires.store(count, Ordering::SeqCst);
    }

    /// Every later call to `operation` (play, pause, seek, set_rate,
    /// set_volume, status) fails until it is restored.
    pub fn fail_operation(&self, operation: &str) {
        self.failing_operations
            .lock()
            .unwrap()
            .insert(operation.to_string());
    }

    pub fn restore_operation(&self, operation: &str) {
        self.failing_operations.lock().unwrap().remove(operation);
    }

    pub fn set_acquire_delay(&self, delay: Duration) {
        *self.acquire_delay.lock().unwrap() = Some(delay);
    }

    pub fn open_handles(&self) -> usize {
        self.players.lock().unwrap().len()
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn volume(&self, handle: AudioHandle) -> Option<f64> {
        self.players.lock().unwrap().get(&handle).map(|p| p.volume)
    }

    pub fn rate(&self, handle: AudioHandle) -> Option<f64> {
        self.players.lock().unwrap().get(&handle).map(|p| p.rate)
    }

    pub fn is_playing(&self, handle: AudioHandle) -> bool {
        self.players
            .lock()
            .unwrap()
            .get(&handle)
            .is_some_and(|p| p.playing)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn update<R>(
        &self,
        handle: AudioHandle,
        operation: &str,
        f: impl FnOnce(&mut MockPlayer) -> R,
    ) -> Result<R, TourError> {
        self.record(operation);
        if self.failing_operations.lock().unwrap().contains(operation) {
            return Err(TourError::audio_operation(operation, "simulated failure"));
        }
        let mut players = self.players.lock().unwrap();
        let player = players
            .get_mut(&handle)
            .ok_or_else(|| TourError::audio_operation(operation, "handle not open"))?;
        Ok(f(player))
    }
}

#[async_trait]
impl AudioBackend for CountingAudio {
    async fn acquire(&self, asset: &str) -> Result<AudioHandle, TourError> {
        self.record(format!("acquire {}", asset));

        let delay = *self.acquire_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self.failing_acquires.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_acquires.store(failing - 1, Ordering::SeqCst);
            return Err(TourError::audio_unavailable(asset, "simulated failure"));
        }

        let duration_ms = *self
            .assets
            .lock()
            .unwrap()
            .get(asset)
            .ok_or_else(|| TourError::audio_unavailable(asset, "unknown asset"))?;

        let mut players = self.players.lock().unwrap();
        assert!(
            players.is_empty(),
            "acquiring {} while {} handle(s) are still open",
            asset,
            players.len()
        );

        let handle = AudioHandle(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        players.insert(
            handle,
            MockPlayer {
                duration_ms,
                volume: 1.0,
                rate: 1.0,
                ..MockPlayer::default()
            },
        );
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    async fn play(&self, handle: AudioHandle) -> Result<(), TourError> {
        self.update(handle, "play", |p| p.playing = true)
    }

    async fn pause(&self, handle: AudioHandle) -> Result<(), TourError> {
        self.update(handle, "pause", |p| p.playing = false)
    }

    async fn seek(&self, handle: AudioHandle, position_ms: u64) -> Result<(), TourError> {
        self.update(handle, "seek", |p| {
            p.position_ms = position_ms.min(p.duration_ms)
        })
    }

    async fn set_rate(&self, handle: AudioHandle, rate: f64) -> Result<(), TourError> {
        self.update(handle, "set_rate", |p| p.rate = rate)
    }

    async fn set_volume(&self, handle: AudioHandle, volume: f64) -> Result<(), TourError> {
        self.update(handle, "set_volume", |p| p.volume = volume)
    }

    async fn status(&self, handle: AudioHandle) -> Result<AudioStatus, TourError> {
        self.update(handle, "status", |p| AudioStatus {
            is_loaded: true,
            is_playing: p.playing,
            position_ms: p.position_ms,
            duration_ms: Some(p.duration_ms),
            did_just_finish: false,
        })
    }

    async fn release(&self, handle: AudioHandle) -> Result<(), TourError> {
        self.record("release");
        match self.players.lock().unwrap().remove(&handle) {
            Some(_) => {
                self.released.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(TourError::audio_operation("release", "handle not open")),
        }
    }
}

pub fn poi(id: &str) -> Poi {
    Poi {
        id: PoiId::new(id),
        name: id.replace('-', " "),
        latitude: 43.6426,
        longitude: -79.3871,
        description: format!("Narration for {}", id),
        category: Category::Landmark,
        rating: 4.8,
        audio_file: format!("audio/{}.mp3", id),
        image: format!("images/{}.jpg", id),
        duration: "15".to_string(),
        price: None,
        featured: false,
    }
}

pub fn controller(audio: &Arc<CountingAudio>) -> PlaybackController {
    PlaybackController::new(audio.clone(), PlaybackSettings::default())
}
