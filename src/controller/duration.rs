//! # Duration Parsing
//!
//! Handles Go-style duration strings as written in `syncPeriod`:
//! "30s", "5m", "1h30m", "5m0s", "1.5h", "250ms".

use crate::constants::DEFAULT_DASHBOARD_SYNC_SECS;
use crate::controller::Error;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static FULL_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+(?:\.\d+)?(?:ms|s|m|h))+$").expect("duration pattern is valid")
});

static DURATION_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<number>\d+(?:\.\d+)?)(?P<unit>ms|s|m|h)").expect("duration part pattern is valid")
});

/// Parse a Go duration string into `std::time::Duration`
///
/// A bare "0" is accepted as zero.
///
/// # Errors
///
/// Returns `Validation` when the string is empty or not a duration.
pub fn parse_go_duration(duration_str: &str) -> Result<Duration, Error> {
    let trimmed = duration_str.trim();

    if trimmed.is_empty() {
        return Err(Error::Validation(
            "Duration string cannot be empty".to_string(),
        ));
    }
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }

    if !FULL_DURATION.is_match(trimmed) {
        return Err(Error::Validation(format!(
            "Invalid duration format '{trimmed}'. Expected Go duration format (e.g., '30s', '5m', '1h30m')"
        )));
    }

    let mut total_ms = 0f64;
    for captures in DURATION_PART.captures_iter(trimmed) {
        let number: f64 = captures["number"].parse().map_err(|e| {
            Error::Validation(format!(
                "Invalid duration number '{}' in '{trimmed}': {e}",
                &captures["number"]
            ))
        })?;
        let unit_ms = match &captures["unit"] {
            "ms" => 1.0,
            "s" => 1_000.0,
            "m" => 60_000.0,
            "h" => 3_600_000.0,
            unit => {
                return Err(Error::Validation(format!(
                    "Invalid unit '{unit}' in duration '{trimmed}'. Expected: ms, s, m or h"
                )))
            }
        };
        total_ms += number * unit_ms;
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "the pattern only admits non-negative numbers"
    )]
    let millis = total_ms.round() as u64;
    Ok(Duration::from_millis(millis))
}

/// Resync interval of a dashboard: empty or zero means the 5 minute default
///
/// # Errors
///
/// Returns `Validation` when the value is set but not a duration.
pub fn sync_interval(sync_period: &str) -> Result<Duration, Error> {
    let default = Duration::from_secs(DEFAULT_DASHBOARD_SYNC_SECS);
    if sync_period.trim().is_empty() {
        return Ok(default);
    }
    let parsed = parse_go_duration(sync_period)?;
    Ok(if parsed.is_zero() { default } else { parsed })
}
