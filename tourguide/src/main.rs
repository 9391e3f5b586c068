mod app;
mod commands;
mod logs;
mod views;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tourconfig::Config;
use tourcontrol::{
    PlaybackController, PlaybackSettings, PoiCatalog, SimulatedAudio, SimulatedWalk, TourSession,
    TourStore,
};
use tracing::{info, warn};

use crate::app::{App, Reply, describe_error};
use crate::commands::{Command, HELP};

const NOTICE_INTERVAL: Duration = Duration::from_millis(250);
const DEFAULT_AUDIO_MINUTES: u32 = 1;

fn config_dir_from_args() -> Result<String> {
    let mut args = std::env::args().skip(1);
    let mut dir = String::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                dir = args.next().context("--config needs a directory")?;
            }
            "-h" | "--help" => {
                println!("Usage: tourguide [--config <dir>]\n\n{}", HELP);
                std::process::exit(0);
            }
            other => bail!("unexpected argument '{}'", other),
        }
    }
    Ok(dir)
}

fn load_catalog(config: &Config) -> Result<PoiCatalog> {
    match config.get_catalog_file()? {
        Some(path) => {
            info!(catalog = %path.display(), "Loading POI catalog");
            Ok(PoiCatalog::load_file(&path)?)
        }
        None => Ok(PoiCatalog::toronto()?),
    }
}

fn playback_settings(config: &Config) -> Result<PlaybackSettings> {
    Ok(PlaybackSettings {
        poll_interval: Duration::from_millis(config.get_poll_interval_ms()?),
        skip_seconds: config.get_skip_seconds()?,
        speeds: config.get_playback_speeds()?,
        start_muted: config.get_start_muted()?,
    })
}

async fn print(text: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await?;
    Ok(())
}

async fn prompt() -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"> ").await?;
    stdout.flush().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_dir = config_dir_from_args()?;
    let config = Arc::new(Config::load_config(&config_dir)?);
    let log_state = logs::init_logging(&config);
    info!(config_dir = config.directory(), "Configuration loaded");

    let catalog = Arc::new(load_catalog(&config)?);
    info!(pois = catalog.len(), "Catalog ready");

    let audio = Arc::new(SimulatedAudio::new());
    for poi in catalog.iter() {
        let minutes = poi.duration_minutes().unwrap_or(DEFAULT_AUDIO_MINUTES);
        audio.register_asset(
            poi.audio_file.clone(),
            Duration::from_secs(u64::from(minutes) * 60),
        );
    }

    let controller = PlaybackController::new(audio, playback_settings(&config)?);
    let tour = TourSession::new(
        catalog,
        TourStore::new(),
        controller,
        config.get_proximity_threshold_km()?,
    );
    let mut app = App::new(tour, SimulatedWalk::toronto(), log_state);

    print(&app.home()).await?;
    print("Type 'help' for the list of commands.").await?;
    prompt().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut notices = tokio::time::interval(NOTICE_INTERVAL);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = notices.tick() => {
                let pending = app.drain_events().await;
                if !pending.is_empty() {
                    print(&format!("\n{}", pending.join("\n"))).await?;
                    prompt().await?;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(None) => {}
                    Ok(Some(command)) => match app.execute(command).await {
                        Ok(Reply::Text(text)) => print(&text).await?,
                        Ok(Reply::Quit) => break,
                        Err(e) => {
                            warn!(error = %e, "Command failed");
                            print(&describe_error(&e)).await?;
                        }
                    },
                    Err(e) => print(&e.to_string()).await?,
                }
                for notice in app.drain_events().await {
                    print(&notice).await?;
                }
                prompt().await?;
            }
        }
    }

    app.shutdown().await;
    info!("Tour guide stopped");
    Ok(())
}
