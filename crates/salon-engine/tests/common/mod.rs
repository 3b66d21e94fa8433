//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use salon_engine::memory::{ServiceDraft, StaffDraft};
use salon_engine::{Customer, InMemorySalon, OpeningWindow, ServiceId, StaffId};

pub const CUT: ServiceId = ServiceId(1);
pub const COLOUR: ServiceId = ServiceId(2);
pub const PERM: ServiceId = ServiceId(3);
pub const BEARD: ServiceId = ServiceId(4);

pub const LINA: StaffId = StaffId(1);
pub const MARA: StaffId = StaffId(2);

/// 2024-06-02, closed.
pub fn sunday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()
}

/// 2024-06-03, open 09:00-10:00.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
}

/// 2024-06-04, open 09:00-18:00.
pub fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 4).unwrap()
}

pub fn at(date: NaiveDate, hour: u32, min: u32) -> DateTime<Utc> {
    use chrono::Datelike;
    Utc.with_ymd_and_hms(date.year(), date.month(), date.day(), hour, min, 0)
        .unwrap()
}

pub fn customer() -> Customer {
    Customer {
        name: "Alice Example".to_string(),
        email: "alice@example.com".to_string(),
        phone: "+49 30 123456".to_string(),
    }
}

/// Four services (one inactive, one without staff), two staff members,
/// open Monday morning and all of Tuesday.
pub fn seeded_salon() -> InMemorySalon {
    let salon = InMemorySalon::new();

    for (name, minutes, price, active) in [
        ("Cut", 30, 3500, true),
        ("Colour", 90, 9900, true),
        ("Perm", 60, 7900, false),
        ("Beard trim", 30, 2000, true),
    ] {
        salon
            .create_service(ServiceDraft {
                name: name.to_string(),
                duration_minutes: minutes,
                price_cents: price,
                active,
            })
            .unwrap();
    }

    salon
        .create_staff(StaffDraft {
            name: "Lina".to_string(),
            bio: "Colour specialist and trend cuts.".to_string(),
            service_ids: BTreeSet::from([CUT, COLOUR, PERM]),
        })
        .unwrap();
    salon
        .create_staff(StaffDraft {
            name: "Mara".to_string(),
            bio: "Short cuts and barbering.".to_string(),
            service_ids: BTreeSet::from([CUT]),
        })
        .unwrap();

    salon
        .upsert_opening_hours(OpeningWindow::parse(1, "09:00", "10:00").unwrap())
        .unwrap();
    salon
        .upsert_opening_hours(OpeningWindow::parse(2, "09:00", "18:00").unwrap())
        .unwrap();

    salon
}
