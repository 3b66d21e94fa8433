//! Error types for salon-engine operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{ServiceId, StaffId};

#[derive(Error, Debug)]
pub enum SalonError {
    /// A referenced service, staff member, booking or opening window does not
    /// exist, or the service is inactive.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The explicitly requested staff member cannot perform the service.
    #[error("Staff member {staff_id} cannot perform service {service_id}")]
    InvalidSelection {
        staff_id: StaffId,
        service_id: ServiceId,
    },

    /// The requested slot is no longer offerable for this staff member.
    #[error("Slot {starts_at} is no longer available for staff member {staff_id}")]
    Conflict {
        staff_id: StaffId,
        starts_at: DateTime<Utc>,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    /// The backing store failed (lock poisoned, I/O in a real backend, ...).
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SalonError>;
