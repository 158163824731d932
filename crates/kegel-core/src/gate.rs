//! Working-hours gate deciding whether a reminder may fire.

use chrono::{NaiveTime, Timelike};

use crate::{error::KegelError, models::WorkingHours};

/// Parse an `HH:MM` string into minutes since midnight.
///
/// # Errors
///
/// Returns a validation error when the value is not a valid `HH:MM` time.
pub fn parse_minute_of_day(value: &str) -> Result<u32, KegelError> {
    let time = NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| KegelError::validation(format!("'{value}' is not a valid HH:MM time")))?;
    Ok(time.hour() * 60 + time.minute())
}

impl WorkingHours {
    /// Inclusive `[start, end]` bounds in minutes since midnight
    ///
    /// # Errors
    ///
    /// Returns a validation error when either bound is not `HH:MM`.
    pub fn bounds(&self) -> Result<(u32, u32), KegelError> {
        Ok((
            parse_minute_of_day(&self.start)?,
            parse_minute_of_day(&self.end)?,
        ))
    }

    /// An `end` earlier than `start`. Such a window never matches.
    #[must_use]
    pub fn is_overnight(&self) -> bool {
        matches!(self.bounds(), Ok((start, end)) if end < start)
    }
}

/// Decide whether `now` falls inside the configured working hours.
///
/// A disabled window imposes no restriction. Bounds are compared by minute
/// of day and are inclusive at both ends. Windows that wrap past midnight
/// are not supported and never match; neither do unparsable bounds.
#[must_use]
pub fn is_within_working_hours<T: Timelike>(now: &T, hours: &WorkingHours) -> bool {
    if !hours.enabled {
        return true;
    }

    let (start, end) = match hours.bounds() {
        Ok(bounds) => bounds,
        Err(e) => {
            log::warn!("Ignoring reminder window, {e}");
            return false;
        }
    };

    let current = now.hour() * 60 + now.minute();
    current >= start && current <= end
}
