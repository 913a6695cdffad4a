//! Time slot model

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Start of a bookable interval on a field, written `HH:MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot(NaiveTime);

impl TimeSlot {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(TimeSlot)
    }

    pub fn start(&self) -> NaiveTime {
        self.0
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    /// Slots starting at `first`, every `step_minutes`, `count` times.
    /// Stops early rather than wrapping past midnight.
    pub fn series(first: TimeSlot, step_minutes: u32, count: usize) -> Vec<TimeSlot> {
        let mut slots = Vec::with_capacity(count);
        let mut minutes = first.0.hour() * 60 + first.0.minute();
        for _ in 0..count {
            match TimeSlot::new(minutes / 60, minutes % 60) {
                Some(slot) if minutes < 24 * 60 => slots.push(slot),
                _ => break,
            }
            minutes += step_minutes;
        }
        slots
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for TimeSlot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Accept "9:00" as well as "09:00"; seconds are not part of a slot
        NaiveTime::parse_from_str(s, "%H:%M")
            .map(TimeSlot)
            .map_err(|_| Error::Validation(format!("Invalid time slot '{}', expected HH:MM", s)))
    }
}

impl From<NaiveTime> for TimeSlot {
    /// Drops seconds; a slot is identified by hour and minute
    fn from(time: NaiveTime) -> Self {
        TimeSlot(NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time))
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.to_string()
    }
}
