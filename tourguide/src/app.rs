//! Command execution for the terminal front end.

use crossbeam_channel::Receiver;
use tourcontrol::{
    PlayPauseOutcome, PlaybackEvent, PoiId, SimulatedWalk, StoreEvent, TourError, TourSession,
};
use tracing::{debug, warn};

use crate::commands::{Command, HELP, SeekTarget};
use crate::logs::LogState;
use crate::views;

#[derive(Debug, PartialEq)]
pub enum Reply {
    Text(String),
    Quit,
}

pub struct App {
    tour: TourSession,
    walk: SimulatedWalk,
    log_state: LogState,
    store_events: Receiver<StoreEvent>,
    playback_events: Receiver<PlaybackEvent>,
}

impl App {
    pub fn new(tour: TourSession, walk: SimulatedWalk, log_state: LogState) -> Self {
        let store_events = tour.store().subscribe();
        let playback_events = tour.controller().subscribe();
        Self {
            tour,
            walk,
            log_state,
            store_events,
            playback_events,
        }
    }

    pub fn home(&self) -> String {
        views::render_home(self.tour.catalog(), &self.tour.store().snapshot())
    }

    fn player(&self) -> String {
        let poi = self.tour.active_poi();
        let is_favorite = poi.is_some_and(|p| self.tour.store().is_favorite(&p.id));
        views::render_player(poi, &self.tour.controller().snapshot(), is_favorite)
    }

    pub async fn execute(&mut self, command: Command) -> Result<Reply, TourError> {
        debug!(?command, "Executing command");
        let controller = self.tour.controller().clone();
        let skip_step = controller.settings().skip_seconds;

        let text = match command {
            Command::Home => self.home(),
            Command::Explore => {
                views::render_explore(self.tour.catalog(), &self.tour.store().snapshot())
            }
            Command::Select(poi_id) => {
                self.tour.store().set_selected_poi_id(poi_id);
                self.process_store_events().await?;
                self.player()
            }
            Command::Play => match controller.play_pause().await? {
                PlayPauseOutcome::Loaded => {
                    format!("{}\nAudio ready, 'play' again to start.", self.player())
                }
                PlayPauseOutcome::Playing | PlayPauseOutcome::Paused => self.player(),
            },
            Command::Seek(SeekTarget::Fraction(fraction)) => {
                controller.seek(fraction).await?;
                self.player()
            }
            Command::Seek(SeekTarget::Time(seconds)) => {
                let duration = controller.snapshot().duration_seconds;
                let fraction = if duration > 0.0 {
                    f64::from(seconds) / duration
                } else {
                    0.0
                };
                controller.seek(fraction).await?;
                self.player()
            }
            Command::Skip(delta) => {
                controller.skip(delta).await?;
                self.player()
            }
            Command::Forward => {
                controller.skip(skip_step).await?;
                self.player()
            }
            Command::Rewind => {
                controller.skip(-skip_step).await?;
                self.player()
            }
            Command::Speed(None) => format!("Speed {}x", controller.cycle_speed().await?),
            Command::Speed(Some(speed)) => {
                controller.set_speed(speed).await?;
                format!("Speed {}x", speed)
            }
            Command::Mute => {
                if controller.toggle_mute().await? {
                    "Muted".to_string()
                } else {
                    "Sound on".to_string()
                }
            }
            Command::Favorite(None) => favorite_text(self.tour.toggle_active_favorite()?),
            Command::Favorite(Some(poi_id)) => self.toggle_favorite(&poi_id)?,
            Command::Status => self.player(),
            Command::Back => {
                self.tour.back().await?;
                self.home()
            }
            Command::Walk => match self.tour.step_location(&self.walk).await? {
                Some(_) => format!("You arrived somewhere interesting.\n{}", self.player()),
                None => "You keep walking, nothing in range.".to_string(),
            },
            Command::Near(position) => match self.tour.on_location(position).await? {
                Some(_) => self.player(),
                None => "No attraction in range.".to_string(),
            },
            Command::Logs(count) => {
                let lines: Vec<String> = self
                    .log_state
                    .recent(count)
                    .iter()
                    .map(|e| e.to_string())
                    .collect();
                if lines.is_empty() {
                    "No log lines yet.".to_string()
                } else {
                    lines.join("\n")
                }
            }
            Command::LogLevel(level) => match self.log_state.set_max_level(level) {
                Ok(()) => format!("Log level set to {}", self.log_state.get_max_level()),
                Err(e) => {
                    warn!(error = %e, "Log level change failed");
                    format!("Could not change the log level: {}", e)
                }
            },
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Reply::Quit),
        };

        Ok(Reply::Text(text))
    }

    fn toggle_favorite(&self, poi_id: &PoiId) -> Result<String, TourError> {
        if !self.tour.catalog().contains(poi_id) {
            return Err(TourError::UnknownPoi(poi_id.to_string()));
        }
        Ok(favorite_text(self.tour.store().toggle_favorite(poi_id.clone())))
    }

    /// Applies pending store notifications to the player.
    async fn process_store_events(&mut self) -> Result<(), TourError> {
        let events: Vec<StoreEvent> = self.store_events.try_iter().collect();
        for event in events {
            self.tour.on_store_event(&event).await?;
        }
        Ok(())
    }

    /// Handles notifications raised outside of a command and returns what
    /// the listener should be told.
    pub async fn drain_events(&mut self) -> Vec<String> {
        let mut notices = Vec::new();

        if let Err(e) = self.process_store_events().await {
            notices.push(describe_error(&e));
        }

        for event in self.playback_events.try_iter() {
            if let PlaybackEvent::Finished { poi_id } = event {
                let name = self
                    .tour
                    .catalog()
                    .get(&poi_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| poi_id.to_string());
                notices.push(format!("Narration for {} finished.", name));
            }
        }

        notices
    }

    pub async fn shutdown(&mut self) {
        if let Err(e) = self.tour.back().await {
            warn!(error = %e, "Failed to release audio on exit");
        }
    }
}

fn favorite_text(is_favorite: bool) -> String {
    if is_favorite {
        "Added to favorites".to_string()
    } else {
        "Removed from favorites".to_string()
    }
}

pub fn describe_error(error: &TourError) -> String {
    if error.is_retryable() {
        format!("{} (you can try again)", error)
    } else {
        error.to_string()
    }
}
