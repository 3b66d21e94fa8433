//! Tests for the availability resolver against the in-memory store.

mod common;

use common::*;
use salon_engine::memory::BookingPatch;
use salon_engine::model::NewBooking;
use salon_engine::store::BookingStore;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use salon_engine::error::Result;
use salon_engine::{
    get_availability, AvailabilityQuery, Booking, BookingStatus, InMemorySalon, SalonError,
    ServiceId, SlotPolicy, StaffAvailability, StaffId,
};

fn query(service_id: ServiceId, staff_id: Option<StaffId>, date: NaiveDate) -> AvailabilityQuery {
    AvailabilityQuery {
        service_id,
        staff_id,
        date,
    }
}

fn resolve(salon: &InMemorySalon, query: AvailabilityQuery) -> Result<Vec<StaffAvailability>> {
    get_availability(salon, &query, SlotPolicy::default())
}

fn book_directly(
    salon: &InMemorySalon,
    staff_id: StaffId,
    start: DateTime<Utc>,
    minutes: i64,
) -> Booking {
    salon
        .insert_booking(NewBooking {
            service_id: CUT,
            staff_id,
            starts_at: start,
            ends_at: start + Duration::minutes(minutes),
            customer: customer(),
            notes: None,
        })
        .unwrap()
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[test]
fn unknown_service_is_not_found() {
    let salon = seeded_salon();
    let result = resolve(&salon, query(ServiceId(99), None, monday()));
    assert!(matches!(result, Err(SalonError::NotFound(_))));
}

#[test]
fn inactive_service_is_not_found() {
    let salon = seeded_salon();
    let result = resolve(&salon, query(PERM, Some(LINA), monday()));
    assert!(matches!(result, Err(SalonError::NotFound(_))));
}

#[test]
fn staff_who_cannot_perform_service_is_invalid_selection() {
    let salon = seeded_salon();

    let result = resolve(&salon, query(COLOUR, Some(MARA), monday()));
    assert!(matches!(
        result,
        Err(SalonError::InvalidSelection { staff_id, service_id })
            if staff_id == MARA && service_id == COLOUR
    ));

    let unknown = resolve(&salon, query(CUT, Some(StaffId(42)), monday()));
    assert!(matches!(unknown, Err(SalonError::InvalidSelection { .. })));
}

#[test]
fn service_without_staff_yields_empty_answer() {
    let salon = seeded_salon();
    let result = resolve(&salon, query(BEARD, None, monday())).unwrap();
    assert!(result.is_empty());
}

// ── Slots ───────────────────────────────────────────────────────────────────

#[test]
fn every_eligible_staff_member_gets_slots() {
    let salon = seeded_salon();

    let result = resolve(&salon, query(CUT, None, monday())).unwrap();

    let staff: Vec<StaffId> = result.iter().map(|a| a.staff_id).collect();
    assert_eq!(staff, vec![LINA, MARA]);
    for availability in &result {
        assert_eq!(availability.slots.len(), 7);
        assert_eq!(availability.slots[0].start, at(monday(), 9, 0));
    }
}

#[test]
fn requested_staff_limits_the_answer() {
    let salon = seeded_salon();

    let result = resolve(&salon, query(CUT, Some(MARA), monday())).unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].staff_id, MARA);
}

#[test]
fn closed_day_gives_each_staff_member_no_slots() {
    let salon = seeded_salon();

    let result = resolve(&salon, query(CUT, None, sunday())).unwrap();

    assert_eq!(result.len(), 2);
    assert!(result.iter().all(|a| a.slots.is_empty()));
}

#[test]
fn bookings_only_affect_their_own_staff_member() {
    let salon = seeded_salon();
    book_directly(&salon, LINA, at(tuesday(), 9, 0), 30);

    let result = resolve(&salon, query(CUT, None, tuesday())).unwrap();

    let lina = result.iter().find(|a| a.staff_id == LINA).unwrap();
    let mara = result.iter().find(|a| a.staff_id == MARA).unwrap();
    assert_eq!(lina.slots[0].start, at(tuesday(), 9, 40));
    assert_eq!(mara.slots[0].start, at(tuesday(), 9, 0));
    assert!(!lina.offers_start(at(tuesday(), 9, 0)));
    assert!(mara.offers_start(at(tuesday(), 9, 0)));
}

#[test]
fn bookings_on_other_days_are_ignored() {
    let salon = seeded_salon();
    book_directly(&salon, LINA, at(monday(), 9, 0), 30);

    let result = resolve(&salon, query(CUT, Some(LINA), tuesday())).unwrap();

    assert!(result[0].offers_start(at(tuesday(), 9, 0)));
}

#[test]
fn cancelled_bookings_free_their_time() {
    let salon = seeded_salon();
    let booking = book_directly(&salon, LINA, at(tuesday(), 9, 0), 30);
    salon
        .update_booking(
            booking.id,
            BookingPatch {
                status: Some(BookingStatus::Cancelled),
                notes: None,
            },
        )
        .unwrap();

    let result = resolve(&salon, query(CUT, Some(LINA), tuesday())).unwrap();

    assert!(result[0].offers_start(at(tuesday(), 9, 0)));
}

#[test]
fn policy_is_applied_per_request() {
    let salon = seeded_salon();
    book_directly(&salon, MARA, at(tuesday(), 9, 0), 30);
    let tight = SlotPolicy::new(0, 30).unwrap();

    let result = get_availability(&salon, &query(CUT, Some(MARA), tuesday()), tight).unwrap();

    assert_eq!(result[0].slots[0].start, at(tuesday(), 9, 30));
    assert_eq!(result[0].slots.len(), 17);
}

#[test]
fn results_reflect_the_latest_bookings() {
    let salon = seeded_salon();
    let q = query(CUT, Some(MARA), tuesday());

    let before = get_availability(&salon, &q, SlotPolicy::default()).unwrap();
    book_directly(&salon, MARA, at(tuesday(), 12, 0), 30);
    let after = get_availability(&salon, &q, SlotPolicy::default()).unwrap();

    assert!(before[0].offers_start(at(tuesday(), 12, 0)));
    assert!(!after[0].offers_start(at(tuesday(), 12, 0)));
}
