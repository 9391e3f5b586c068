//! Time formatting and parsing for the player.
//!
//! The backend speaks milliseconds, the session keeps fractional seconds and
//! the player view shows `m:ss`.

use crate::errors::TourError;

/// Formats seconds as `m:ss`, truncating fractions.
///
/// # Examples
/// ```
/// # use tourcontrol::playback::time_utils::format_clock;
/// assert_eq!(format_clock(0.0), "0:00");
/// assert_eq!(format_clock(65.9), "1:05");
/// assert_eq!(format_clock(900.0), "15:00");
/// ```
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Parses `H:MM:SS`, `M:SS` or `SS` to seconds.
///
/// # Examples
/// ```
/// # use tourcontrol::playback::time_utils::parse_time_flexible;
/// assert_eq!(parse_time_flexible("1:02:03").unwrap(), 3723);
/// assert_eq!(parse_time_flexible("2:03").unwrap(), 123);
/// assert_eq!(parse_time_flexible("42").unwrap(), 42);
/// ```
pub fn parse_time_flexible(input: &str) -> Result<u32, TourError> {
    let input = input.trim();
    let parts: Vec<&str> = input.split(':').collect();

    if parts.len() > 3 {
        return Err(TourError::InvalidTimeFormat(format!(
            "'{}': expected H:MM:SS, M:SS or SS",
            input
        )));
    }

    let mut total = 0u32;
    for part in parts {
        let value = part.parse::<u32>().map_err(|_| {
            TourError::InvalidTimeFormat(format!("invalid number '{}' in '{}'", part, input))
        })?;
        total = total
            .checked_mul(60)
            .and_then(|t| t.checked_add(value))
            .ok_or_else(|| TourError::InvalidTimeFormat(format!("'{}' is too large", input)))?;
    }

    Ok(total)
}

#[inline]
pub fn ms_to_seconds(milliseconds: u64) -> f64 {
    milliseconds as f64 / 1000.0
}

/// Negative and non-finite values map to 0.
#[inline]
pub fn seconds_to_ms(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}
