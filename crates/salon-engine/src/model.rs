//! Reference data and booking records the engine operates on.
//!
//! All of these are owned by external storage; the engine only ever sees
//! transient, in-memory projections of them.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SalonError};
use crate::slots::BookedInterval;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a bookable service.
    ServiceId
);
id_type!(
    /// Identifier of a staff member.
    StaffId
);
id_type!(
    /// Identifier of a stored booking.
    BookingId
);

/// A bookable service. Duration is the only scheduling-relevant attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub duration_minutes: u32,
    pub price_cents: u32,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Staff members linked to this service.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub eligible_staff_ids: BTreeSet<StaffId>,
}

fn default_active() -> bool {
    true
}

impl Service {
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }

    /// End instant of an appointment for this service starting at `start`.
    pub fn ends_at(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + self.duration()
    }

    pub fn can_be_performed_by(&self, staff_id: StaffId) -> bool {
        self.eligible_staff_ids.contains(&staff_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: StaffId,
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub service_ids: BTreeSet<ServiceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Customer {
    /// Check the contact details a booking needs before any slot work is done.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().chars().count() < 2 {
            return Err(SalonError::Validation(
                "customer name must have at least 2 characters".to_string(),
            ));
        }
        if !is_plausible_email(&self.email) {
            return Err(SalonError::Validation(format!(
                "invalid customer email: '{}'",
                self.email
            )));
        }
        if self.phone.trim().chars().count() < 6 {
            return Err(SalonError::Validation(
                "customer phone must have at least 6 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// `local@domain.tld` with no whitespace; deliverability is the mailer's problem.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    /// Whether a booking in this status still occupies its staff member's time.
    pub fn blocks_time(self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = SalonError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "no_show" => Ok(BookingStatus::NoShow),
            other => Err(SalonError::Validation(format!(
                "unknown booking status: '{}'",
                other
            ))),
        }
    }
}

/// A stored appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub service_id: ServiceId,
    pub staff_id: StaffId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub customer: Customer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: BookingStatus,
}

impl Booking {
    pub fn interval(&self) -> BookedInterval {
        BookedInterval {
            starts_at: self.starts_at,
            ends_at: self.ends_at,
        }
    }
}

/// A booking about to be written; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub service_id: ServiceId,
    pub staff_id: StaffId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub customer: Customer,
    pub notes: Option<String>,
}
