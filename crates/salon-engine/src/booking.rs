//! Booking admission.
//!
//! [`BookingDesk::book`] re-runs the availability resolver for the requested
//! staff member and date immediately before writing, and only admits a start
//! instant that is still offered. The re-check and the insert run inside a
//! critical section keyed by staff id, so two requests racing for the same
//! staff member are serialized and the loser sees the winner's booking.
//!
//! The per-staff lock covers callers sharing one `BookingDesk`, and
//! [`crate::store::BookingStore::insert_booking`] rejects overlaps among the
//! bookings that store can see. Neither reaches across processes: when several
//! processes each load their own copy of the data, they must serialize the
//! whole load, book and save sequence themselves (the `salon` binary holds an
//! exclusive file lock for it).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::availability::{active_service, get_availability, AvailabilityQuery, StaffAvailability};
use crate::error::{Result, SalonError};
use crate::model::{Booking, Customer, NewBooking, Service, ServiceId, StaffId};
use crate::notify::{compose_notifications, BookingNotifier, NoopNotifier};
use crate::slots::SlotPolicy;
use crate::store::SalonStore;

/// Longest free-text note a customer may attach.
pub const MAX_NOTES_CHARS: usize = 500;

/// Default sender and inbox for booking notifications.
pub const DEFAULT_SALON_ADDRESS: &str = "SalonNova <noreply@salonnova.local>";

/// A customer's request for one concrete slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub service_id: ServiceId,
    pub staff_id: StaffId,
    pub starts_at: DateTime<Utc>,
    pub customer: Customer,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookingRequest {
    fn validate(&self) -> Result<()> {
        self.customer.validate()?;
        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_NOTES_CHARS {
                return Err(SalonError::Validation(format!(
                    "notes must not exceed {} characters",
                    MAX_NOTES_CHARS
                )));
            }
        }
        Ok(())
    }
}

/// Admits bookings against a store, one staff member at a time.
pub struct BookingDesk<S: ?Sized> {
    store: Arc<S>,
    policy: SlotPolicy,
    notifier: Arc<dyn BookingNotifier>,
    salon_address: String,
    staff_locks: Mutex<HashMap<StaffId, Arc<Mutex<()>>>>,
}

impl<S> BookingDesk<S>
where
    S: SalonStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            policy: SlotPolicy::default(),
            notifier: Arc::new(NoopNotifier),
            salon_address: DEFAULT_SALON_ADDRESS.to_string(),
            staff_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_policy(mut self, policy: SlotPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_notifier(
        mut self,
        notifier: Arc<dyn BookingNotifier>,
        salon_address: impl Into<String>,
    ) -> Self {
        self.notifier = notifier;
        self.salon_address = salon_address.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> SlotPolicy {
        self.policy
    }

    /// Availability under this desk's policy.
    pub fn availability(&self, query: &AvailabilityQuery) -> Result<Vec<StaffAvailability>> {
        get_availability(self.store.as_ref(), query, self.policy)
    }

    /// Validate, re-check and insert a booking.
    ///
    /// # Errors
    ///
    /// * `SalonError::Validation` — malformed customer details or notes.
    /// * `SalonError::NotFound` — unknown or inactive service.
    /// * `SalonError::InvalidSelection` — the staff member cannot perform the service.
    /// * `SalonError::Conflict` — the start instant is no longer offered. The
    ///   caller has to pick a new slot; no alternative is chosen here.
    pub fn book(&self, request: BookingRequest) -> Result<Booking> {
        request.validate()?;

        let service = active_service(self.store.as_ref(), request.service_id)?;
        if !service.can_be_performed_by(request.staff_id) {
            return Err(SalonError::InvalidSelection {
                staff_id: request.staff_id,
                service_id: service.id,
            });
        }

        let booking = {
            let lock = self.staff_lock(request.staff_id)?;
            let _guard = lock
                .lock()
                .map_err(|_| SalonError::Storage("staff lock poisoned".to_string()))?;
            self.recheck_and_insert(&service, request)?
        };

        self.send_notifications(&booking, &service);
        Ok(booking)
    }

    fn staff_lock(&self, staff_id: StaffId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .staff_locks
            .lock()
            .map_err(|_| SalonError::Storage("staff lock table poisoned".to_string()))?;
        Ok(locks.entry(staff_id).or_default().clone())
    }

    /// Must be called with the staff member's lock held.
    fn recheck_and_insert(&self, service: &Service, request: BookingRequest) -> Result<Booking> {
        let query = AvailabilityQuery {
            service_id: service.id,
            staff_id: Some(request.staff_id),
            date: request.starts_at.date_naive(),
        };
        let availability = get_availability(self.store.as_ref(), &query, self.policy)?;

        let offered = availability
            .iter()
            .find(|a| a.staff_id == request.staff_id)
            .is_some_and(|a| a.offers_start(request.starts_at));
        if !offered {
            warn!(
                service_id = %service.id,
                staff_id = %request.staff_id,
                starts_at = %request.starts_at,
                "requested slot is no longer available"
            );
            return Err(SalonError::Conflict {
                staff_id: request.staff_id,
                starts_at: request.starts_at,
            });
        }

        let notes = request
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let booking = self.store.insert_booking(NewBooking {
            service_id: service.id,
            staff_id: request.staff_id,
            starts_at: request.starts_at,
            ends_at: service.ends_at(request.starts_at),
            customer: request.customer,
            notes,
        })?;

        info!(
            booking_id = %booking.id,
            service_id = %booking.service_id,
            staff_id = %booking.staff_id,
            starts_at = %booking.starts_at,
            "booking admitted"
        );
        Ok(booking)
    }

    /// Delivery failures are logged; the booking stands regardless.
    fn send_notifications(&self, booking: &Booking, service: &Service) {
        let staff_name = match self.store.staff_member(booking.staff_id) {
            Ok(Some(member)) => member.name,
            Ok(None) => booking.staff_id.to_string(),
            Err(err) => {
                warn!(staff_id = %booking.staff_id, error = %err, "staff lookup for notification failed");
                booking.staff_id.to_string()
            }
        };

        for notification in
            compose_notifications(booking, &service.name, &staff_name, &self.salon_address)
        {
            if let Err(err) = self.notifier.deliver(&notification) {
                warn!(
                    booking_id = %booking.id,
                    to = %notification.to,
                    error = %err,
                    "booking notification failed"
                );
            }
        }
    }
}
