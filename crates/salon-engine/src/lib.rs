//! # salon-engine
//!
//! Conflict-free appointment slots and race-safe booking admission for a
//! salon.
//!
//! Given opening hours, a service duration and a staff member's existing
//! bookings, the engine produces the exact set of start times that can be
//! offered, keeping a buffer around every booking. The same computation is
//! repeated at commit time so a slot that was taken in the meantime is
//! refused with a conflict instead of being double-booked.
//!
//! ## Modules
//!
//! - [`slots`] — pure slot generator for one staff member and one day
//! - [`window`] — opening windows and time-of-day helpers
//! - [`availability`] — per-staff availability for a service and a date
//! - [`booking`] — admission re-check and insert (`BookingDesk`)
//! - [`store`] — collaborator traits for storage
//! - [`memory`] — in-memory store with administrative operations
//! - [`notify`] — booking confirmation messages
//! - [`model`] — services, staff, customers, bookings
//! - [`error`] — Error types

pub mod availability;
pub mod booking;
pub mod error;
pub mod memory;
pub mod model;
pub mod notify;
pub mod slots;
pub mod store;
pub mod window;

pub use availability::{get_availability, AvailabilityQuery, StaffAvailability};
pub use booking::{BookingDesk, BookingRequest};
pub use error::SalonError;
pub use memory::{InMemorySalon, SalonSnapshot};
pub use model::{
    Booking, BookingId, BookingStatus, Customer, Service, ServiceId, StaffId, StaffMember,
};
pub use slots::{generate_slots, BookedInterval, CandidateSlot, SlotPolicy};
pub use window::{is_within_opening_hours, OpeningWindow};
