//! Plain-text renderings of the home, explore and player screens.

use std::fmt::Write;

use tourcontrol::playback::time_utils::format_clock;
use tourcontrol::{Category, PlaybackSession, Poi, PoiCatalog, StoreSnapshot};

const PROGRESS_WIDTH: usize = 30;

pub fn render_home(catalog: &PoiCatalog, store: &StoreSnapshot) -> String {
    let summary = catalog.summary();
    let mut out = String::new();

    let _ = writeln!(out, "Discover Toronto");
    let _ = writeln!(
        out,
        "  {} locations | {}m of audio | {} rating",
        summary.location_count,
        summary.total_audio_minutes,
        summary
            .average_rating
            .map(|r| format!("{:.1}*", r))
            .unwrap_or_else(|| "-".to_string()),
    );

    let _ = writeln!(out, "\nFeatured");
    for poi in catalog.featured() {
        let _ = writeln!(out, "{}", poi_line(poi, store));
    }

    let favorites = catalog.favorites(&store.favorites);
    if !favorites.is_empty() {
        let _ = writeln!(out, "\nYour favorites");
        for poi in favorites {
            let _ = writeln!(out, "{}", poi_line(poi, store));
        }
    }

    out
}

pub fn render_explore(catalog: &PoiCatalog, store: &StoreSnapshot) -> String {
    let mut out = String::new();
    for category in Category::ALL {
        let mut pois = catalog.by_category(category).peekable();
        if pois.peek().is_none() {
            continue;
        }
        let _ = writeln!(out, "[{}] {}", category.marker_color(), category);
        for poi in pois {
            let _ = writeln!(
                out,
                "{}  ({:.4}, {:.4})",
                poi_line(poi, store),
                poi.latitude,
                poi.longitude
            );
        }
    }
    out
}

pub fn render_player(poi: Option<&Poi>, session: &PlaybackSession, is_favorite: bool) -> String {
    let Some(poi) = poi else {
        return "No place selected. Use 'select <id>' or 'walk'.".to_string();
    };

    let mut out = String::new();
    let heart = if is_favorite { " <3" } else { "" };
    let _ = writeln!(out, "{}{}", poi.name, heart);
    let _ = writeln!(out, "  {}", poi.description);

    let state = if session.is_loading {
        "loading"
    } else if session.is_playing {
        "playing"
    } else {
        "paused"
    };
    let _ = writeln!(
        out,
        "  {} {} / {}  [{}]",
        progress_bar(session.progress_fraction),
        format_clock(session.position_seconds),
        format_clock(session.duration_seconds),
        state
    );
    let _ = write!(
        out,
        "  speed {}x{}",
        session.speed_multiplier,
        if session.is_muted { " | muted" } else { "" }
    );
    out
}

fn poi_line(poi: &Poi, store: &StoreSnapshot) -> String {
    let mark = if store.favorites.contains(&poi.id) {
        "<3"
    } else {
        "  "
    };
    let price = poi
        .price
        .map(|p| format!(" | ${:.0}", p))
        .unwrap_or_default();
    format!(
        "  {} {:<22} {:<20} {:.1}* | {} min{}",
        mark,
        poi.id.as_str(),
        poi.name,
        poi.rating,
        poi.duration,
        price
    )
}

fn progress_bar(fraction: f64) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (fraction * PROGRESS_WIDTH as f64).round() as usize;
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(PROGRESS_WIDTH - filled)
    )
}
