//! Wall-time arithmetic for slot booking.
//!
//! Appointments live on a minutes-since-midnight grid within one
//! calendar day. These helpers are pure: parsing `"HH:MM"` strings,
//! composing date + time into concrete instants, and the half-open
//! interval overlap predicate the conflict check is built on.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{BookingError, Result};

/// Parse a wall time in `"HH:MM"` (24-hour) form into minutes since
/// midnight.
///
/// # Errors
///
/// Returns [`BookingError::Validation`] when the string is not a valid
/// `HH:MM` time.
pub fn parse_wall_time(s: &str) -> Result<u32> {
    let t = NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|e| BookingError::validation("time", format!("'{}': {}", s.trim(), e)))?;
    Ok(t.hour() * 60 + t.minute())
}

/// Minutes since midnight of a wall-clock instant.
pub fn minutes_of_day(dt: NaiveDateTime) -> u32 {
    dt.time().hour() * 60 + dt.time().minute()
}

/// Compose a calendar date and minutes-since-midnight into a wall-clock
/// instant.
///
/// # Errors
///
/// Returns [`BookingError::Validation`] when the minutes run past the
/// end of the day; an appointment never rolls over midnight.
pub fn at_minutes(date: NaiveDate, minutes: u32) -> Result<NaiveDateTime> {
    if minutes >= 24 * 60 {
        return Err(BookingError::validation(
            "time",
            format!("{minutes} minutes is past the end of the day"),
        ));
    }
    let time = NaiveTime::from_num_seconds_from_midnight_opt(minutes * 60, 0)
        .ok_or_else(|| BookingError::validation("time", format!("{minutes} minutes")))?;
    Ok(date.and_time(time))
}

/// Format minutes since midnight back to `"HH:MM"`.
pub fn format_wall_time(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// End wall time of a slot starting at `start` and running
/// `duration_minutes`. Hours are not wrapped at midnight (`"23:30"` +
/// 60 minutes is `"24:30"`), matching the grid arithmetic callers
/// display.
///
/// # Errors
///
/// Returns [`BookingError::Validation`] when `start` is malformed.
pub fn end_wall_time(start: &str, duration_minutes: u32) -> Result<String> {
    Ok(format_wall_time(parse_wall_time(start)? + duration_minutes))
}

/// Half-open interval overlap: `[a_start, a_end)` intersects
/// `[b_start, b_end)`. Touching boundaries do not overlap, so
/// back-to-back bookings are allowed.
pub fn overlaps(a_start: u32, a_end: u32, b_start: u32, b_end: u32) -> bool {
    a_start < b_end && a_end > b_start
}
