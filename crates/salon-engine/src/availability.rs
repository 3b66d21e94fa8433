//! Per-staff availability for a service on a given date.
//!
//! Resolves the eligible staff set, then runs the slot generator once per
//! staff member against that member's bookings for the whole calendar day.
//! Nothing is cached: every call reads the latest booking rows, which is what
//! lets the booking desk reuse this resolver as its admission check.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SalonError};
use crate::model::{Booking, Service, ServiceId, StaffId};
use crate::slots::{generate_slots, BookedInterval, CandidateSlot, SlotPolicy};
use crate::store::{SalonStore, ServiceCatalog};
use crate::window::{day_bounds, weekday_index};

/// An availability request: a service, optionally one staff member, a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub service_id: ServiceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<StaffId>,
    pub date: NaiveDate,
}

/// Offerable slots for one staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffAvailability {
    pub staff_id: StaffId,
    pub slots: Vec<CandidateSlot>,
}

impl StaffAvailability {
    /// Whether a slot starting exactly at `start` (same instant) is offered.
    pub fn offers_start(&self, start: chrono::DateTime<chrono::Utc>) -> bool {
        self.slots.iter().any(|slot| slot.start == start)
    }
}

/// Compute availability for every eligible staff member.
///
/// # Errors
///
/// * `SalonError::NotFound` — the service does not exist or is inactive.
/// * `SalonError::InvalidSelection` — `query.staff_id` is set but that staff
///   member is not linked to the service.
///
/// A service with no linked staff yields an empty list when no specific staff
/// member was requested.
pub fn get_availability<S>(
    store: &S,
    query: &AvailabilityQuery,
    policy: SlotPolicy,
) -> Result<Vec<StaffAvailability>>
where
    S: SalonStore + ?Sized,
{
    let service = active_service(store, query.service_id)?;

    let staff_ids: Vec<StaffId> = match query.staff_id {
        Some(staff_id) => {
            if !service.can_be_performed_by(staff_id) {
                return Err(SalonError::InvalidSelection {
                    staff_id,
                    service_id: service.id,
                });
            }
            vec![staff_id]
        }
        None => service.eligible_staff_ids.iter().copied().collect(),
    };

    if staff_ids.is_empty() {
        return Ok(Vec::new());
    }

    let opening = store.opening_for_weekday(weekday_index(query.date))?;
    let (day_start, day_end) = day_bounds(query.date);

    staff_ids
        .into_iter()
        .map(|staff_id| {
            let bookings = store.bookings_for_staff_between(staff_id, day_start, day_end)?;
            let taken: Vec<BookedInterval> = bookings.iter().map(Booking::interval).collect();

            let slots = generate_slots(
                query.date,
                service.duration_minutes,
                opening.as_ref(),
                &taken,
                policy,
            );

            debug!(
                service_id = %service.id,
                staff_id = %staff_id,
                date = %query.date,
                existing = taken.len(),
                slots = slots.len(),
                "computed staff availability"
            );

            Ok(StaffAvailability { staff_id, slots })
        })
        .collect()
}

/// Look up a service that can currently be booked.
pub(crate) fn active_service<C>(catalog: &C, service_id: ServiceId) -> Result<Service>
where
    C: ServiceCatalog + ?Sized,
{
    match catalog.service(service_id)? {
        Some(service) if service.active => Ok(service),
        Some(_) => Err(SalonError::NotFound(format!(
            "service {} is inactive",
            service_id
        ))),
        None => Err(SalonError::NotFound(format!("service {}", service_id))),
    }
}
