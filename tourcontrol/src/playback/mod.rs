//! Tour player: one audio handle bound to the active POI, transport controls
//! and position polling.

mod controller;
mod session;
pub mod time_utils;
mod watcher;

pub use controller::{LoadOutcome, PlayPauseOutcome, PlaybackController, PlaybackSettings};
pub use session::PlaybackSession;
