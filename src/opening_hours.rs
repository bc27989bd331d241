//! Facility opening-hours evaluation.
//!
//! Decides whether a facility is open right now from its operating days and
//! an hours-range string ("9:00 AM - 5:00 PM", "24 Hours", "08:00 - 22:30").
//! Malformed or absent schedule data is normalized to `HoursNotListed`; this
//! module never returns an error and never panics. Overnight ranges (end
//! earlier than start, e.g. "10:00 PM - 6:00 AM") wrap past midnight.

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Hours-range sentinel meaning the facility never closes.
pub const ALWAYS_OPEN_SENTINEL: &str = "24 hours";

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Operating schedule as carried on a facility record: open weekdays plus
/// the raw hours-range string. Built per evaluation call; never persisted
/// or mutated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatingSchedule {
    /// Weekday names ("Monday" … "Sunday") the facility is open.
    pub days: Vec<String>,
    /// `"<start> - <end>"`, the always-open sentinel, or free text.
    pub hours_range: String,
}

impl OperatingSchedule {
    pub fn new(days: Vec<String>, hours_range: impl Into<String>) -> Self {
        Self {
            days,
            hours_range: hours_range.into(),
        }
    }
}

/// Current opening status of a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpeningStatus {
    /// Schedule absent or malformed.
    HoursNotListed,
    Closed,
    Open,
    Open24Hours,
}

impl OpeningStatus {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open | Self::Open24Hours)
    }

    /// Badge label for the presentation layer.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HoursNotListed => "Hours not listed",
            Self::Closed => "Closed",
            Self::Open => "Open",
            Self::Open24Hours => "Open 24 Hours",
        }
    }
}

/// Evaluates a schedule against the local wall clock.
pub fn evaluate_now(schedule: &OperatingSchedule) -> OpeningStatus {
    evaluate_at(schedule, Local::now().naive_local())
}

/// Evaluates a schedule at an explicit moment. Pure and total: identical
/// inputs always yield identical output, and no input can make it panic.
pub fn evaluate_at(schedule: &OperatingSchedule, now: NaiveDateTime) -> OpeningStatus {
    let range = schedule.hours_range.trim();
    if schedule.days.is_empty() || range.is_empty() {
        return OpeningStatus::HoursNotListed;
    }

    let today = now.format("%A").to_string();
    let open_today = schedule
        .days
        .iter()
        .any(|d| d.trim().eq_ignore_ascii_case(&today));
    if !open_today {
        return OpeningStatus::Closed;
    }

    if range.eq_ignore_ascii_case(ALWAYS_OPEN_SENTINEL) {
        return OpeningStatus::Open24Hours;
    }

    // Exactly one hyphen separating two time tokens; anything else means the
    // hours string is free text we cannot interpret.
    let mut parts = range.split('-');
    let (start_token, end_token) = match (parts.next(), parts.next(), parts.next()) {
        (Some(start), Some(end), None) => (start, end),
        _ => return OpeningStatus::HoursNotListed,
    };

    let (start, mut end) = match (parse_time(start_token), parse_time(end_token)) {
        (Some(start), Some(end)) => (start, end),
        _ => return OpeningStatus::HoursNotListed,
    };

    let mut current = now.hour() * 60 + now.minute();

    // An end earlier than the start means the facility closes after
    // midnight. Wrap the end forward a day, and a post-midnight "now" with
    // it so it compares against the wrapped end.
    if end < start {
        end += MINUTES_PER_DAY;
        if current < start {
            current += MINUTES_PER_DAY;
        }
    }

    // End exclusive: at the closing minute the facility is already closed.
    if start <= current && current < end {
        OpeningStatus::Open
    } else {
        OpeningStatus::Closed
    }
}

/// Parses a single time token (`"9:00 AM"`, `"17:30"`, `"12 AM"`) into
/// minutes since midnight. Minutes default to 0 when omitted.
fn parse_time(token: &str) -> Option<u32> {
    let upper = token.trim().to_ascii_uppercase();

    let (clock, meridiem) = if let Some(rest) = upper.strip_suffix("PM") {
        (rest.trim_end(), Some("PM"))
    } else if let Some(rest) = upper.strip_suffix("AM") {
        (rest.trim_end(), Some("AM"))
    } else {
        (upper.as_str(), None)
    };

    let mut fields = clock.split(':');
    let hour: u32 = fields.next()?.trim().parse().ok()?;
    let minute: u32 = match fields.next() {
        Some(m) => m.trim().parse().ok()?,
        None => 0,
    };
    if fields.next().is_some() {
        return None;
    }

    let hour = match meridiem {
        Some("PM") if hour != 12 => hour + 12,
        Some("AM") if hour == 12 => 0,
        _ => hour,
    };

    if hour > 23 || minute > 59 {
        return None;
    }
    Some(hour * 60 + minute)
}
