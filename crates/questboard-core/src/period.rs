//! Period keying.
//!
//! Completion records are partitioned by a period key derived from "now".
//! A record from yesterday never matches today's key, so rollover needs no
//! explicit reset; purging old records is storage hygiene only.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Date format used for daily keys and event `until` dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rollover namespace of a completion record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Event,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Event => "event",
        }
    }

    /// Key for records of this period at `now`.
    ///
    /// Event records are keyed per task kind, see [`event_key`]; for the
    /// event period this returns today's date.
    pub fn key(&self, now: &DateTime<FixedOffset>) -> String {
        match self {
            Period::Daily | Period::Event => daily_key(now),
            Period::Weekly => weekly_key(now),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "event" => Ok(Period::Event),
            other => Err(CoreError::invalid(
                "period",
                format!("expected daily, weekly or event, got '{other}'"),
            )),
        }
    }
}

/// Recurrence of a task inside an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventTaskKind {
    /// Recurs every day until the event ends
    Daily,
    /// Single deliverable due by the event's end date
    #[default]
    Once,
}

impl EventTaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventTaskKind::Daily => "daily",
            EventTaskKind::Once => "once",
        }
    }
}

impl fmt::Display for EventTaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventTaskKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(EventTaskKind::Daily),
            "once" => Ok(EventTaskKind::Once),
            other => Err(CoreError::invalid(
                "kind",
                format!("expected daily or once, got '{other}'"),
            )),
        }
    }
}

/// Today's date as `YYYY-MM-DD`.
pub fn daily_key(now: &DateTime<FixedOffset>) -> String {
    now.format(DATE_FORMAT).to_string()
}

/// Week of the month, anchored to the weekday of the 1st.
///
/// `floor((day + weekday(first)) / 7) + 1` with Monday = 0. A month that
/// starts on a Sunday already has its 1st in week 2.
pub fn week_of_month(date: NaiveDate) -> u32 {
    let first_weekday = date
        .with_day(1)
        .map(|first| first.weekday().num_days_from_monday())
        .unwrap_or(0);
    (date.day() + first_weekday) / 7 + 1
}

/// Weekly key as `MM-W{week_of_month}`.
pub fn weekly_key(now: &DateTime<FixedOffset>) -> String {
    let date = now.date_naive();
    format!("{:02}-W{}", date.month(), week_of_month(date))
}

/// Key for an event task: today for daily-kind tasks, the event's end date
/// for once-kind tasks.
pub fn event_key(today: NaiveDate, kind: EventTaskKind, until: NaiveDate) -> String {
    match kind {
        EventTaskKind::Daily => today.format(DATE_FORMAT).to_string(),
        EventTaskKind::Once => until.format(DATE_FORMAT).to_string(),
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|e| {
        CoreError::invalid("date", format!("'{}' is not YYYY-MM-DD: {e}", input.trim()))
    })
}
