//! Opening windows and the time-of-day arithmetic shared by the slot generator
//! and the availability resolver.
//!
//! The salon runs on a single implicit local clock. Instants are carried as
//! `DateTime<Utc>` and a window's `HH:MM` values are applied to a calendar day
//! without any zone conversion.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SalonError};

/// Opening hours for one weekday. Absence of a window means closed that day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOpeningWindow", into = "RawOpeningWindow")]
pub struct OpeningWindow {
    weekday: u8,
    open: NaiveTime,
    // `None` closes at the following midnight ("24:00").
    close: Option<NaiveTime>,
}

/// Closing value that runs a window to the end of its day.
pub const END_OF_DAY: &str = "24:00";

impl OpeningWindow {
    /// Build a window for `weekday` (0 = Sunday ... 6 = Saturday).
    ///
    /// # Errors
    /// Returns `SalonError::Validation` when the weekday is out of range or
    /// `open` is not strictly before `close`.
    pub fn new(weekday: u8, open: NaiveTime, close: NaiveTime) -> Result<Self> {
        check_weekday(weekday)?;
        if open >= close {
            return Err(SalonError::Validation(format!(
                "opening time {} must be before closing time {}",
                open.format("%H:%M"),
                close.format("%H:%M")
            )));
        }
        Ok(Self {
            weekday,
            open,
            close: Some(close),
        })
    }

    /// A window from `open` to the end of the day.
    pub fn until_end_of_day(weekday: u8, open: NaiveTime) -> Result<Self> {
        check_weekday(weekday)?;
        Ok(Self {
            weekday,
            open,
            close: None,
        })
    }

    /// Convenience constructor from `"HH:MM"` strings. `close` may also be
    /// `"24:00"` for a window that runs to midnight.
    pub fn parse(weekday: u8, open: &str, close: &str) -> Result<Self> {
        let open = parse_time_of_day(open)?;
        if close == END_OF_DAY {
            return Self::until_end_of_day(weekday, open);
        }
        Self::new(weekday, open, parse_time_of_day(close)?)
    }

    pub fn weekday(&self) -> u8 {
        self.weekday
    }

    pub fn open(&self) -> NaiveTime {
        self.open
    }

    /// Closing time, or `None` when the window runs to midnight.
    pub fn close(&self) -> Option<NaiveTime> {
        self.close
    }

    /// Opening and closing instants on `day`.
    pub fn bounds_on(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let open = day.and_time(self.open).and_utc();
        let close = match self.close {
            Some(close) => day.and_time(close).and_utc(),
            None => day_bounds(day).1,
        };
        (open, close)
    }

    pub fn length_minutes(&self) -> i64 {
        match self.close {
            Some(close) => (close - self.open).num_minutes(),
            None => Duration::days(1).num_minutes() - (self.open - NaiveTime::MIN).num_minutes(),
        }
    }
}

fn check_weekday(weekday: u8) -> Result<()> {
    if weekday > 6 {
        return Err(SalonError::Validation(format!(
            "weekday must be in 0..=6, got {}",
            weekday
        )));
    }
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct RawOpeningWindow {
    weekday: u8,
    open: String,
    close: String,
}

impl TryFrom<RawOpeningWindow> for OpeningWindow {
    type Error = SalonError;

    fn try_from(raw: RawOpeningWindow) -> Result<Self> {
        OpeningWindow::parse(raw.weekday, &raw.open, &raw.close)
    }
}

impl From<OpeningWindow> for RawOpeningWindow {
    fn from(window: OpeningWindow) -> Self {
        RawOpeningWindow {
            weekday: window.weekday,
            open: window.open.format("%H:%M").to_string(),
            close: match window.close {
                Some(close) => close.format("%H:%M").to_string(),
                None => END_OF_DAY.to_string(),
            },
        }
    }
}

/// Parse a strict `"HH:MM"` time of day. `"24:00"` is not a time of day;
/// only [`OpeningWindow::parse`] accepts it, as a closing value.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime> {
    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 5
        && bytes[2] == b':'
        && [0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit());
    if !well_formed {
        return Err(SalonError::Validation(format!(
            "time of day must look like HH:MM, got '{}'",
            value
        )));
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| SalonError::Validation(format!("invalid time of day: '{}'", value)))
}

/// Half-open check `open <= instant < close`, evaluated on the instant's own day.
///
/// An absent window (closed) never contains anything.
pub fn is_within_opening_hours(instant: DateTime<Utc>, opening: Option<&OpeningWindow>) -> bool {
    let Some(window) = opening else {
        return false;
    };
    let (open, close) = window.bounds_on(instant.date_naive());
    instant >= open && instant < close
}

/// Weekday index used by opening hours: 0 = Sunday ... 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// The full calendar day `[00:00, next 00:00)` containing `date`.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

