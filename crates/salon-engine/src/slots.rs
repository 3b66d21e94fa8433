//! Slot generation for a single staff member on a single day.
//!
//! Walks a fixed grid of start times from opening to closing, and keeps every
//! candidate that fits the service duration inside the window and stays clear
//! of each existing booking padded by the buffer on both sides.
//!
//! The grid does not adapt to conflicts: the cursor always advances by the
//! interval, whether or not the previous candidate was accepted.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SalonError};
use crate::window::OpeningWindow;

/// Minutes kept free before and after every existing booking.
pub const DEFAULT_BUFFER_MINUTES: u32 = 10;

/// Spacing of the candidate start-time grid.
pub const DEFAULT_INTERVAL_MINUTES: u32 = 5;

/// Buffer and grid spacing applied during slot generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPolicy {
    buffer_minutes: u32,
    interval_minutes: u32,
}

impl Default for SlotPolicy {
    fn default() -> Self {
        Self {
            buffer_minutes: DEFAULT_BUFFER_MINUTES,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
        }
    }
}

impl SlotPolicy {
    /// # Errors
    /// Returns `SalonError::Validation` if `interval_minutes` is zero.
    pub fn new(buffer_minutes: u32, interval_minutes: u32) -> Result<Self> {
        if interval_minutes == 0 {
            return Err(SalonError::Validation(
                "slot interval must be at least one minute".to_string(),
            ));
        }
        Ok(Self {
            buffer_minutes,
            interval_minutes,
        })
    }

    pub fn buffer_minutes(&self) -> u32 {
        self.buffer_minutes
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    pub fn buffer(&self) -> Duration {
        Duration::minutes(i64::from(self.buffer_minutes))
    }

    pub fn interval(&self) -> Duration {
        Duration::minutes(i64::from(self.interval_minutes))
    }
}

/// A time range already taken on a staff member's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedInterval {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// An offerable appointment `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Padded overlap test: the booking's exclusion zone is
/// `[starts_at - buffer, ends_at + buffer)`.
pub fn conflicts_with_buffer(
    candidate: &CandidateSlot,
    booking: &BookedInterval,
    buffer: Duration,
) -> bool {
    candidate.start < booking.ends_at + buffer && candidate.end > booking.starts_at - buffer
}

/// Generate the ordered, conflict-free candidate slots for one staff member.
///
/// # Arguments
///
/// * `day` — Calendar day the opening window is applied to.
/// * `duration_minutes` — Length of the requested service.
/// * `opening` — Opening window for `day`'s weekday; `None` means closed.
/// * `existing` — That staff member's bookings on `day`. Not validated.
/// * `policy` — Buffer and grid interval.
///
/// A closed day or a service longer than the window yields an empty list;
/// this function never fails.
pub fn generate_slots(
    day: NaiveDate,
    duration_minutes: u32,
    opening: Option<&OpeningWindow>,
    existing: &[BookedInterval],
    policy: SlotPolicy,
) -> Vec<CandidateSlot> {
    let Some(window) = opening else {
        return Vec::new();
    };

    let (window_start, window_end) = window.bounds_on(day);
    let duration = Duration::minutes(i64::from(duration_minutes));
    let buffer = policy.buffer();
    let step = policy.interval();

    let mut slots = Vec::new();
    let mut cursor = window_start;

    while cursor + duration <= window_end {
        let candidate = CandidateSlot {
            start: cursor,
            end: cursor + duration,
        };

        let blocked = existing
            .iter()
            .any(|booking| conflicts_with_buffer(&candidate, booking, buffer));
        if !blocked {
            slots.push(candidate);
        }

        cursor += step;
    }

    slots
}
