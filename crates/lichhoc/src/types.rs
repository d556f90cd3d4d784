use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Tag used by the data source for special (non-class) activities
pub const SPECIAL_KIND: &str = "special";

/// A single scheduled class or activity
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Course name
    pub subject: String,

    /// Physical or virtual location
    pub room: String,

    /// Student group or section
    pub group: String,

    /// Topic of the session
    pub content: String,

    pub year: i32,
    pub month: u32,
    pub day: u32,

    /// Start time in zero-padded HH:MM (24h) format
    pub start_time: String,

    /// End time in zero-padded HH:MM (24h) format, same day as the start
    pub end_time: String,

    /// Number of teaching periods the session spans
    pub periods: u32,

    /// Kind of entry (e.g., "class", "special")
    #[serde(rename = "type")]
    pub kind: String,
}

impl Session {
    /// The composed calendar date, if the year/month/day triple is a real date
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    pub fn start(&self) -> Option<NaiveTime> {
        parse_clock(&self.start_time)
    }

    pub fn end(&self) -> Option<NaiveTime> {
        parse_clock(&self.end_time)
    }

    /// Date and start time combined
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        Some(self.date()?.and_time(self.start()?))
    }

    /// Length of the session in minutes
    pub fn duration_minutes(&self) -> Option<i64> {
        Some((self.end()? - self.start()?).num_minutes())
    }

    pub fn is_special(&self) -> bool {
        self.kind == SPECIAL_KIND
    }
}

/// Parse a zero-padded `HH:MM` clock time.
///
/// Single-digit hours are rejected so that lexicographic comparison of the
/// raw strings stays equivalent to chronological order.
pub fn parse_clock(text: &str) -> Option<NaiveTime> {
    if text.len() != 5 || text.as_bytes()[2] != b':' {
        return None;
    }
    NaiveTime::parse_from_str(text, "%H:%M").ok()
}

/// Named relative period used to restrict sessions by date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "String")]
pub enum TimeRange {
    #[default]
    All,
    Today,
    ThisWeek,
    ThisMonth,
    NextWeek,
}

impl TimeRange {
    pub const ALL: [TimeRange; 5] = [
        TimeRange::All,
        TimeRange::Today,
        TimeRange::ThisWeek,
        TimeRange::ThisMonth,
        TimeRange::NextWeek,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeRange::All => "all",
            TimeRange::Today => "today",
            TimeRange::ThisWeek => "thisWeek",
            TimeRange::ThisMonth => "thisMonth",
            TimeRange::NextWeek => "nextWeek",
        }
    }
}

/// Unrecognized values mean "no restriction"
impl FromStr for TimeRange {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "today" => TimeRange::Today,
            "thisWeek" => TimeRange::ThisWeek,
            "thisMonth" => TimeRange::ThisMonth,
            "nextWeek" => TimeRange::NextWeek,
            _ => TimeRange::All,
        })
    }
}

impl From<String> for TimeRange {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(range) => range,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search text, subject set and time range currently selected by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub search_text: String,

    /// Subjects to keep; empty means no subject restriction
    pub subjects: Vec<String>,

    pub time_range: TimeRange,
}

impl FilterCriteria {
    /// True when no search, subject or time restriction is active
    pub fn is_empty(&self) -> bool {
        self.search_text.is_empty() && self.subjects.is_empty() && self.time_range == TimeRange::All
    }
}

/// Summary counts shown above the calendar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub unique_subjects: usize,
    pub total_sessions: usize,
    pub today_sessions: usize,
    pub this_week_sessions: usize,
}
