/// Calendar tagging: year, month and meteorological season per timestamp.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Meteorological seasons, in the order they fall within a calendar year's
/// grouping (December is counted with its own year's Winter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Fall];

    /// Maps a month number (1–12) to its season.
    ///
    /// {12, 1, 2} → Winter, {3, 4, 5} → Spring, {6, 7, 8} → Summer,
    /// {9, 10, 11} → Fall. Returns `None` outside 1–12.
    pub fn from_month(month: u32) -> Option<Season> {
        match month {
            12 | 1 | 2 => Some(Season::Winter),
            3..=5 => Some(Season::Spring),
            6..=8 => Some(Season::Summer),
            9..=11 => Some(Season::Fall),
            _ => None,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Winter => write!(f, "Winter"),
            Season::Spring => write!(f, "Spring"),
            Season::Summer => write!(f, "Summer"),
            Season::Fall => write!(f, "Fall"),
        }
    }
}

/// Calendar attributes derived from one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarTag {
    pub year: i32,
    pub month: u32,
    pub season: Season,
}

/// Derives year, month and season for `time`.
pub fn tag(time: &DateTime<Utc>) -> CalendarTag {
    let month = time.month();
    CalendarTag {
        year: time.year(),
        month,
        // chrono guarantees 1..=12
        season: Season::from_month(month).unwrap_or(Season::Winter),
    }
}
