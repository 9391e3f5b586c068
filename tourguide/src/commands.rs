use anyhow::{Result, anyhow, bail};
use tourcontrol::playback::time_utils::parse_time_flexible;
use tourcontrol::{GeoPoint, PoiId};
use tracing::Level;

use crate::logs::string_to_level;

const DEFAULT_LOG_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum SeekTarget {
    /// Share of the narration, 0.0 to 1.0.
    Fraction(f64),
    /// Absolute position in seconds.
    Time(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Home,
    Explore,
    Select(PoiId),
    Play,
    Seek(SeekTarget),
    Skip(f64),
    Forward,
    Rewind,
    /// `None` cycles through the configured speeds.
    Speed(Option<f64>),
    Mute,
    /// `None` toggles the POI in the player.
    Favorite(Option<PoiId>),
    Status,
    Back,
    Walk,
    Near(GeoPoint),
    Logs(usize),
    LogLevel(Level),
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  home                  featured places and tour statistics
  explore               every place, by category
  select <id>           open a place in the player
  play                  play or pause the narration
  seek <0-1|m:ss|n%>    jump within the narration
  skip <seconds>        move forward (positive) or back (negative)
  forward | rewind      skip by the configured step
  speed [x]             set the speed, or cycle through the presets
  mute                  toggle sound
  fav [id]              toggle a favorite (the open place by default)
  status                show the player
  back                  leave the player
  walk                  take one step along the simulated walk
  near <lat> <lon>      pretend to stand at a position
  logs [n]              show recent log lines
  loglevel <level>      error, warn, info, debug or trace
  help                  this text
  quit                  leave";

impl Command {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_lowercase().as_str(), args.as_slice()) {
            ("home", []) => Command::Home,
            ("explore" | "map", []) => Command::Explore,
            ("select" | "open", [id]) => Command::Select(PoiId::new(*id)),
            ("play" | "pause" | "p", []) => Command::Play,
            ("seek", [target]) => Command::Seek(parse_seek_target(target)?),
            ("skip", [delta]) => Command::Skip(parse_number(delta, "skip offset")?),
            ("forward" | "ff", []) => Command::Forward,
            ("rewind" | "rw", []) => Command::Rewind,
            ("speed", []) => Command::Speed(None),
            ("speed", [value]) => {
                let value = value.trim_end_matches(['x', 'X']);
                Command::Speed(Some(parse_number(value, "speed")?))
            }
            ("mute", []) => Command::Mute,
            ("fav" | "favorite", []) => Command::Favorite(None),
            ("fav" | "favorite", [id]) => Command::Favorite(Some(PoiId::new(*id))),
            ("status" | "player", []) => Command::Status,
            ("back", []) => Command::Back,
            ("walk", []) => Command::Walk,
            ("near", [lat, lon]) => {
                let position = GeoPoint::new(
                    parse_number(lat, "latitude")?,
                    parse_number(lon, "longitude")?,
                );
                if !position.is_valid() {
                    bail!("{} {} is not a valid position", lat, lon);
                }
                Command::Near(position)
            }
            ("logs", []) => Command::Logs(DEFAULT_LOG_LINES),
            ("logs", [count]) => Command::Logs(
                count
                    .parse()
                    .map_err(|_| anyhow!("'{}' is not a line count", count))?,
            ),
            ("loglevel", [level]) => Command::LogLevel(
                string_to_level(level).ok_or_else(|| anyhow!("unknown log level '{}'", level))?,
            ),
            ("help" | "?", []) => Command::Help,
            ("quit" | "exit" | "q", []) => Command::Quit,
            (verb, _) if is_known(verb) => bail!("wrong arguments for '{}', try 'help'", verb),
            (verb, _) => bail!("unknown command '{}', try 'help'", verb),
        };

        Ok(Some(command))
    }
}

/// Every verb `parse` accepts, aliases included.
const VERBS: &[&str] = &[
    "home", "explore", "map", "select", "open", "play", "pause", "p", "seek", "skip", "forward",
    "ff", "rewind", "rw", "speed", "mute", "fav", "favorite", "status", "player", "back", "walk",
    "near", "logs", "loglevel", "help", "?", "quit", "exit", "q",
];

fn is_known(verb: &str) -> bool {
    VERBS.contains(&verb)
}

fn parse_number(value: &str, what: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| anyhow!("'{}' is not a valid {}", value, what))
}

fn parse_seek_target(value: &str) -> Result<SeekTarget> {
    if value.contains(':') {
        return Ok(SeekTarget::Time(parse_time_flexible(value)?));
    }
    if let Some(percent) = value.strip_suffix('%') {
        return Ok(SeekTarget::Fraction(parse_number(percent, "percentage")? / 100.0));
    }
    Ok(SeekTarget::Fraction(parse_number(value, "fraction")?))
}
