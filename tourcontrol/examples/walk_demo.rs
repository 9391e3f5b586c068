// examples/walk_demo.rs
//
// Walks the simulated Toronto path and prints the playback events the
// tour emits along the way:
//   - proximity rebinding to the nearest POI
//   - automatic load, then play
//   - position updates every 100 ms
//
//   cargo run -p tourcontrol --example walk_demo
//   cargo run -p tourcontrol --example walk_demo -- 3     # seconds per stop

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tourcontrol::{
    PlaybackController, PlaybackEvent, PlaybackSettings, PoiCatalog, SimulatedAudio,
    SimulatedWalk, TourSession, TourStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt::try_init();

    let dwell = env::args()
        .nth(1)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(2);

    let catalog = Arc::new(PoiCatalog::toronto()?);
    let audio = Arc::new(SimulatedAudio::new());
    for poi in catalog.iter() {
        audio.register_asset(poi.audio_file.clone(), Duration::from_secs(30));
    }

    let controller = PlaybackController::new(audio, PlaybackSettings::default());
    let events = controller.subscribe();
    let mut tour = TourSession::new(catalog, TourStore::new(), controller, 0.05);
    let walk = SimulatedWalk::toronto();

    for step in 0..walk.len() {
        match tour.step_location(&walk).await? {
            Some(poi_id) => {
                println!("[step {}] near {}", step, poi_id);
                tour.controller().play_pause().await?;
            }
            None => println!("[step {}] nothing in range", step),
        }

        tokio::time::sleep(Duration::from_secs(dwell)).await;

        let mut ticks = 0;
        for event in events.try_iter() {
            match event {
                PlaybackEvent::PositionChanged { .. } => ticks += 1,
                other => println!("    {:?}", other),
            }
        }
        let session = tour.controller().snapshot();
        println!(
            "    {} position updates, now at {:.1}s / {:.1}s",
            ticks, session.position_seconds, session.duration_seconds
        );
    }

    tour.back().await?;
    println!("Walk finished.");
    Ok(())
}
