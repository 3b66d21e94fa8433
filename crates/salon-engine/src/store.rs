//! Narrow interfaces to the storage the engine depends on.
//!
//! The engine never holds a global client handle: every operation receives
//! its store explicitly, so tests can swap in [`crate::memory::InMemorySalon`].

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{Booking, NewBooking, Service, ServiceId, StaffId, StaffMember};
use crate::window::OpeningWindow;

pub trait OpeningHoursStore: Send + Sync {
    /// Opening window for `weekday` (0 = Sunday), or `None` when closed.
    fn opening_for_weekday(&self, weekday: u8) -> Result<Option<OpeningWindow>>;
}

pub trait BookingStore: Send + Sync {
    /// Time-blocking bookings of `staff_id` starting in `[start, end)`,
    /// sorted by start.
    fn bookings_for_staff_between(
        &self,
        staff_id: StaffId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>>;

    /// Persist a booking.
    ///
    /// Implementations must refuse an interval that overlaps another
    /// time-blocking booking of the same staff member with
    /// `SalonError::Conflict`, and an empty or inverted interval with
    /// `SalonError::Validation`.
    fn insert_booking(&self, booking: NewBooking) -> Result<Booking>;
}

pub trait ServiceCatalog: Send + Sync {
    /// The service with its eligible staff, or `None` if it does not exist.
    fn service(&self, id: ServiceId) -> Result<Option<Service>>;
}

pub trait StaffDirectory: Send + Sync {
    fn staff_member(&self, id: StaffId) -> Result<Option<StaffMember>>;
}

/// Everything the availability resolver and the booking desk need.
pub trait SalonStore: OpeningHoursStore + BookingStore + ServiceCatalog + StaffDirectory {}

impl<T> SalonStore for T where
    T: OpeningHoursStore + BookingStore + ServiceCatalog + StaffDirectory + ?Sized
{
}
