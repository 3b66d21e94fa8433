//! In-memory salon store.
//!
//! Implements every collaborator trait over a single `RwLock`-guarded state,
//! together with the administrative operations (services, staff, opening
//! hours, bookings). Writes take the lock exclusively, so the overlap check in
//! [`BookingStore::insert_booking`] and the write itself are atomic.
//!
//! The whole state round-trips through [`SalonSnapshot`], which is what the
//! CLI keeps on disk as JSON.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SalonError};
use crate::model::{
    Booking, BookingId, BookingStatus, NewBooking, Service, ServiceId, StaffId, StaffMember,
};
use crate::store::{BookingStore, OpeningHoursStore, ServiceCatalog, StaffDirectory};
use crate::window::{day_bounds, OpeningWindow};

/// Shortest service an administrator may create.
pub const MIN_SERVICE_MINUTES: u32 = 15;

/// Serializable image of the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalonSnapshot {
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub staff: Vec<StaffMember>,
    #[serde(default)]
    pub opening_hours: Vec<OpeningWindow>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

impl SalonSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDraft {
    pub name: String,
    pub duration_minutes: u32,
    pub price_cents: u32,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePatch {
    pub name: Option<String>,
    pub duration_minutes: Option<u32>,
    pub price_cents: Option<u32>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffDraft {
    pub name: String,
    pub bio: String,
    #[serde(default)]
    pub service_ids: BTreeSet<ServiceId>,
}

/// Partial staff update. `service_ids`, when present, replaces the links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffPatch {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub service_ids: Option<BTreeSet<ServiceId>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPatch {
    pub status: Option<BookingStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    // Services are stored without staff links; `staff` is the single owner
    // of the many-to-many relation.
    services: BTreeMap<ServiceId, Service>,
    staff: BTreeMap<StaffId, StaffMember>,
    opening_hours: BTreeMap<u8, OpeningWindow>,
    bookings: BTreeMap<BookingId, Booking>,
    next_service_id: u32,
    next_staff_id: u32,
    next_booking_id: u32,
}

impl State {
    fn with_links(&self, service: &Service) -> Service {
        let mut linked = service.clone();
        linked.eligible_staff_ids = self
            .staff
            .values()
            .filter(|member| member.service_ids.contains(&service.id))
            .map(|member| member.id)
            .collect();
        linked
    }

    fn check_services_exist(&self, ids: &BTreeSet<ServiceId>) -> Result<()> {
        match ids.iter().find(|id| !self.services.contains_key(id)) {
            Some(missing) => Err(SalonError::NotFound(format!("service {}", missing))),
            None => Ok(()),
        }
    }

    /// First time-blocking booking of `staff_id` overlapping `[start, end)`.
    fn overlapping(
        &self,
        staff_id: StaffId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        ignore: Option<BookingId>,
    ) -> Option<&Booking> {
        self.bookings.values().find(|b| {
            Some(b.id) != ignore
                && b.staff_id == staff_id
                && b.status.blocks_time()
                && b.starts_at < end
                && start < b.ends_at
        })
    }
}

/// Reference [`crate::store::SalonStore`] implementation.
#[derive(Debug)]
pub struct InMemorySalon {
    state: RwLock<State>,
}

impl Default for InMemorySalon {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySalon {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                next_service_id: 1,
                next_staff_id: 1,
                next_booking_id: 1,
                ..State::default()
            }),
        }
    }

    /// Load a snapshot, checking ids are unique and references resolve.
    ///
    /// Links may be given on either side (`staff[].service_ids` or
    /// `services[].eligible_staff_ids`); both are merged. Bookings must name
    /// an existing service and staff member, and a staff member's confirmed
    /// or completed bookings must not overlap.
    pub fn from_snapshot(snapshot: SalonSnapshot) -> Result<Self> {
        let mut state = State::default();

        let mut service_links: Vec<(ServiceId, StaffId)> = Vec::new();
        for mut service in snapshot.services {
            if service.duration_minutes == 0 {
                return Err(SalonError::Validation(format!(
                    "service {} has a zero duration",
                    service.id
                )));
            }
            let links = std::mem::take(&mut service.eligible_staff_ids);
            service_links.extend(links.into_iter().map(|staff_id| (service.id, staff_id)));
            if state.services.insert(service.id, service.clone()).is_some() {
                return Err(duplicate("service", service.id));
            }
        }

        for member in snapshot.staff {
            state.check_services_exist(&member.service_ids)?;
            if state.staff.insert(member.id, member.clone()).is_some() {
                return Err(duplicate("staff member", member.id));
            }
        }

        for (service_id, staff_id) in service_links {
            let member = state.staff.get_mut(&staff_id).ok_or_else(|| {
                SalonError::NotFound(format!(
                    "staff member {} linked from service {}",
                    staff_id, service_id
                ))
            })?;
            member.service_ids.insert(service_id);
        }

        for window in snapshot.opening_hours {
            if state.opening_hours.insert(window.weekday(), window).is_some() {
                return Err(duplicate("opening hours for weekday", window.weekday()));
            }
        }

        for booking in snapshot.bookings {
            if booking.ends_at <= booking.starts_at {
                return Err(SalonError::Validation(format!(
                    "booking {} ends before it starts",
                    booking.id
                )));
            }
            if !state.services.contains_key(&booking.service_id) {
                return Err(SalonError::NotFound(format!(
                    "service {} referenced by booking {}",
                    booking.service_id, booking.id
                )));
            }
            if !state.staff.contains_key(&booking.staff_id) {
                return Err(SalonError::NotFound(format!(
                    "staff member {} referenced by booking {}",
                    booking.staff_id, booking.id
                )));
            }
            if state.bookings.contains_key(&booking.id) {
                return Err(duplicate("booking", booking.id));
            }
            if booking.status.blocks_time()
                && state
                    .overlapping(booking.staff_id, booking.starts_at, booking.ends_at, None)
                    .is_some()
            {
                return Err(SalonError::Conflict {
                    staff_id: booking.staff_id,
                    starts_at: booking.starts_at,
                });
            }
            state.bookings.insert(booking.id, booking);
        }

        state.next_service_id = next_id(state.services.keys().map(|id| id.0), "service")?;
        state.next_staff_id = next_id(state.staff.keys().map(|id| id.0), "staff member")?;
        state.next_booking_id = next_id(state.bookings.keys().map(|id| id.0), "booking")?;

        Ok(Self {
            state: RwLock::new(state),
        })
    }

    pub fn snapshot(&self) -> Result<SalonSnapshot> {
        let state = self.read()?;
        Ok(SalonSnapshot {
            services: state.services.values().map(|s| state.with_links(s)).collect(),
            staff: state.staff.values().cloned().collect(),
            opening_hours: state.opening_hours.values().copied().collect(),
            bookings: state.bookings.values().cloned().collect(),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| SalonError::Storage("salon state lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| SalonError::Storage("salon state lock poisoned".to_string()))
    }

    // ── Services ────────────────────────────────────────────────────────────

    /// Services ordered by id; inactive ones only when `include_inactive`.
    pub fn list_services(&self, include_inactive: bool) -> Result<Vec<Service>> {
        let state = self.read()?;
        Ok(state
            .services
            .values()
            .filter(|s| include_inactive || s.active)
            .map(|s| state.with_links(s))
            .collect())
    }

    pub fn create_service(&self, draft: ServiceDraft) -> Result<Service> {
        validate_name(&draft.name, "service name")?;
        validate_duration(draft.duration_minutes)?;

        let mut state = self.write()?;
        let id = ServiceId(take_id(&mut state.next_service_id, "service")?);
        let service = Service {
            id,
            name: draft.name.trim().to_string(),
            duration_minutes: draft.duration_minutes,
            price_cents: draft.price_cents,
            active: draft.active,
            eligible_staff_ids: BTreeSet::new(),
        };
        state.services.insert(id, service.clone());
        Ok(service)
    }

    pub fn update_service(&self, id: ServiceId, patch: ServicePatch) -> Result<Service> {
        if let Some(name) = &patch.name {
            validate_name(name, "service name")?;
        }
        if let Some(minutes) = patch.duration_minutes {
            validate_duration(minutes)?;
        }

        let mut state = self.write()?;
        let service = state
            .services
            .get_mut(&id)
            .ok_or_else(|| SalonError::NotFound(format!("service {}", id)))?;
        if let Some(name) = patch.name {
            service.name = name.trim().to_string();
        }
        if let Some(minutes) = patch.duration_minutes {
            service.duration_minutes = minutes;
        }
        if let Some(price) = patch.price_cents {
            service.price_cents = price;
        }
        if let Some(active) = patch.active {
            service.active = active;
        }
        let updated = service.clone();
        Ok(state.with_links(&updated))
    }

    /// Remove a service and unlink it from every staff member.
    pub fn delete_service(&self, id: ServiceId) -> Result<()> {
        let mut state = self.write()?;
        if state.services.remove(&id).is_none() {
            return Err(SalonError::NotFound(format!("service {}", id)));
        }
        for member in state.staff.values_mut() {
            member.service_ids.remove(&id);
        }
        Ok(())
    }

    // ── Staff ───────────────────────────────────────────────────────────────

    pub fn list_staff(&self) -> Result<Vec<StaffMember>> {
        Ok(self.read()?.staff.values().cloned().collect())
    }

    pub fn create_staff(&self, draft: StaffDraft) -> Result<StaffMember> {
        validate_name(&draft.name, "staff name")?;
        validate_bio(&draft.bio)?;

        let mut state = self.write()?;
        state.check_services_exist(&draft.service_ids)?;
        let id = StaffId(take_id(&mut state.next_staff_id, "staff member")?);
        let member = StaffMember {
            id,
            name: draft.name.trim().to_string(),
            bio: draft.bio.trim().to_string(),
            service_ids: draft.service_ids,
        };
        state.staff.insert(id, member.clone());
        Ok(member)
    }

    pub fn update_staff(&self, id: StaffId, patch: StaffPatch) -> Result<StaffMember> {
        if let Some(name) = &patch.name {
            validate_name(name, "staff name")?;
        }
        if let Some(bio) = &patch.bio {
            validate_bio(bio)?;
        }

        let mut state = self.write()?;
        if let Some(service_ids) = &patch.service_ids {
            state.check_services_exist(service_ids)?;
        }
        let member = state
            .staff
            .get_mut(&id)
            .ok_or_else(|| SalonError::NotFound(format!("staff member {}", id)))?;
        if let Some(name) = patch.name {
            member.name = name.trim().to_string();
        }
        if let Some(bio) = patch.bio {
            member.bio = bio.trim().to_string();
        }
        if let Some(service_ids) = patch.service_ids {
            member.service_ids = service_ids;
        }
        Ok(member.clone())
    }

    pub fn delete_staff(&self, id: StaffId) -> Result<()> {
        let mut state = self.write()?;
        state
            .staff
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| SalonError::NotFound(format!("staff member {}", id)))
    }

    // ── Opening hours ───────────────────────────────────────────────────────

    /// Opening windows sorted by weekday.
    pub fn list_opening_hours(&self) -> Result<Vec<OpeningWindow>> {
        Ok(self.read()?.opening_hours.values().copied().collect())
    }

    /// Insert or replace the window for `window.weekday()`.
    pub fn upsert_opening_hours(&self, window: OpeningWindow) -> Result<OpeningWindow> {
        self.write()?.opening_hours.insert(window.weekday(), window);
        Ok(window)
    }

    /// Mark `weekday` as closed.
    pub fn remove_opening_hours(&self, weekday: u8) -> Result<()> {
        self.write()?
            .opening_hours
            .remove(&weekday)
            .map(|_| ())
            .ok_or_else(|| SalonError::NotFound(format!("opening hours for weekday {}", weekday)))
    }

    // ── Bookings ────────────────────────────────────────────────────────────

    /// Bookings ordered by start, optionally limited to one calendar day.
    /// Cancelled bookings are included.
    pub fn list_bookings(&self, day: Option<NaiveDate>) -> Result<Vec<Booking>> {
        let state = self.read()?;
        let bounds = day.map(day_bounds);
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| match bounds {
                Some((start, end)) => b.starts_at >= start && b.starts_at < end,
                None => true,
            })
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.starts_at, b.id));
        Ok(bookings)
    }

    pub fn booking(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.read()?.bookings.get(&id).cloned())
    }

    /// Change status and/or notes.
    ///
    /// Reviving a cancelled booking fails with `Conflict` if its time has been
    /// taken in the meantime.
    pub fn update_booking(&self, id: BookingId, patch: BookingPatch) -> Result<Booking> {
        let mut state = self.write()?;
        let current = state
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| SalonError::NotFound(format!("booking {}", id)))?;

        if let Some(status) = patch.status {
            if status.blocks_time()
                && !current.status.blocks_time()
                && state
                    .overlapping(current.staff_id, current.starts_at, current.ends_at, Some(id))
                    .is_some()
            {
                return Err(SalonError::Conflict {
                    staff_id: current.staff_id,
                    starts_at: current.starts_at,
                });
            }
        }

        let booking = state
            .bookings
            .get_mut(&id)
            .ok_or_else(|| SalonError::NotFound(format!("booking {}", id)))?;
        if let Some(status) = patch.status {
            booking.status = status;
        }
        if let Some(notes) = patch.notes {
            booking.notes = Some(notes).filter(|n| !n.trim().is_empty());
        }
        Ok(booking.clone())
    }

    pub fn delete_booking(&self, id: BookingId) -> Result<()> {
        self.write()?
            .bookings
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| SalonError::NotFound(format!("booking {}", id)))
    }
}

impl OpeningHoursStore for InMemorySalon {
    fn opening_for_weekday(&self, weekday: u8) -> Result<Option<OpeningWindow>> {
        Ok(self.read()?.opening_hours.get(&weekday).copied())
    }
}

impl BookingStore for InMemorySalon {
    fn bookings_for_staff_between(
        &self,
        staff_id: StaffId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>> {
        let state = self.read()?;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| {
                b.staff_id == staff_id
                    && b.status.blocks_time()
                    && b.starts_at >= start
                    && b.starts_at < end
            })
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.starts_at);
        Ok(bookings)
    }

    fn insert_booking(&self, booking: NewBooking) -> Result<Booking> {
        if booking.ends_at <= booking.starts_at {
            return Err(SalonError::Validation(
                "booking must end after it starts".to_string(),
            ));
        }

        let mut state = self.write()?;
        if !state.services.contains_key(&booking.service_id) {
            return Err(SalonError::NotFound(format!("service {}", booking.service_id)));
        }
        if !state.staff.contains_key(&booking.staff_id) {
            return Err(SalonError::NotFound(format!(
                "staff member {}",
                booking.staff_id
            )));
        }
        if state
            .overlapping(booking.staff_id, booking.starts_at, booking.ends_at, None)
            .is_some()
        {
            return Err(SalonError::Conflict {
                staff_id: booking.staff_id,
                starts_at: booking.starts_at,
            });
        }

        let id = BookingId(take_id(&mut state.next_booking_id, "booking")?);
        let stored = Booking {
            id,
            service_id: booking.service_id,
            staff_id: booking.staff_id,
            starts_at: booking.starts_at,
            ends_at: booking.ends_at,
            customer: booking.customer,
            notes: booking.notes,
            status: BookingStatus::Confirmed,
        };
        state.bookings.insert(id, stored.clone());
        Ok(stored)
    }
}

impl ServiceCatalog for InMemorySalon {
    fn service(&self, id: ServiceId) -> Result<Option<Service>> {
        let state = self.read()?;
        Ok(state.services.get(&id).map(|s| state.with_links(s)))
    }
}

impl StaffDirectory for InMemorySalon {
    fn staff_member(&self, id: StaffId) -> Result<Option<StaffMember>> {
        Ok(self.read()?.staff.get(&id).cloned())
    }
}

/// One past the largest id in use. `u32::MAX` itself is never assignable.
fn next_id(ids: impl Iterator<Item = u32>, kind: &str) -> Result<u32> {
    match ids.max() {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or_else(|| ids_exhausted(kind)),
    }
}

/// Hand out `*counter` and advance it.
fn take_id(counter: &mut u32, kind: &str) -> Result<u32> {
    let id = *counter;
    *counter = id.checked_add(1).ok_or_else(|| ids_exhausted(kind))?;
    Ok(id)
}

fn ids_exhausted(kind: &str) -> SalonError {
    SalonError::Validation(format!("{} ids exhausted", kind))
}

fn duplicate(kind: &str, id: impl std::fmt::Display) -> SalonError {
    SalonError::Validation(format!("duplicate {} {}", kind, id))
}

fn validate_name(name: &str, what: &str) -> Result<()> {
    if name.trim().chars().count() < 2 {
        return Err(SalonError::Validation(format!(
            "{} must have at least 2 characters",
            what
        )));
    }
    Ok(())
}

fn validate_bio(bio: &str) -> Result<()> {
    if bio.trim().chars().count() < 10 {
        return Err(SalonError::Validation(
            "staff bio must have at least 10 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_duration(minutes: u32) -> Result<()> {
    if minutes < MIN_SERVICE_MINUTES {
        return Err(SalonError::Validation(format!(
            "service duration must be at least {} minutes",
            MIN_SERVICE_MINUTES
        )));
    }
    Ok(())
}
