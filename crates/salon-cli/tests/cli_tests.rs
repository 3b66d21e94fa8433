//! Integration tests for the `salon` CLI binary.
//!
//! These run the actual binary with `assert_cmd` against a copy of the
//! `fixtures/salon.json` data file, covering queries, admission, the
//! administrative subcommands and exit codes.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

/// Helper: path to the salon.json fixture.
fn fixture_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/salon.json")
}

/// Helper: a private, writable copy of the fixture for tests that mutate it.
fn scratch_copy(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "salon-cli-{}-{}.json",
        name,
        std::process::id()
    ));
    std::fs::copy(fixture_path(), &path).expect("fixture must be copyable");
    path
}

fn salon() -> Command {
    let mut cmd = Command::cargo_bin("salon").unwrap();
    cmd.env_remove("SALON_DATA")
        .env_remove("SALON_BUFFER_MINUTES")
        .env_remove("SALON_INTERVAL_MINUTES")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout must be JSON")
}

// ─────────────────────────────────────────────────────────────────────────────
// slots
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn slots_for_one_hour_window() {
    let output = salon()
        .args([
            "slots", "--date", "2024-06-03", "--open", "09:00", "--close", "10:00", "--duration",
            "30",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let slots = stdout_json(&output);
    let slots = slots.as_array().unwrap();
    assert_eq!(slots.len(), 7);
    assert_eq!(slots[0]["start"], "2024-06-03T09:00:00Z");
    assert_eq!(slots[6]["start"], "2024-06-03T09:30:00Z");
}

#[test]
fn slots_respect_booked_intervals_and_policy_flags() {
    let output = salon()
        .args([
            "slots",
            "--date",
            "2024-06-03",
            "--open",
            "09:00",
            "--close",
            "11:00",
            "--duration",
            "30",
            "--booked",
            "2024-06-03T09:00:00Z/2024-06-03T09:30:00Z",
            "--buffer-minutes",
            "15",
            "--interval-minutes",
            "15",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let starts: Vec<String> = stdout_json(&output)
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["start"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        starts,
        vec![
            "2024-06-03T09:45:00Z",
            "2024-06-03T10:00:00Z",
            "2024-06-03T10:15:00Z",
            "2024-06-03T10:30:00Z",
        ]
    );
}

fn first_start_after_booking(buffer_env: Option<&str>) -> String {
    let mut cmd = salon();
    if let Some(buffer) = buffer_env {
        cmd.env("SALON_BUFFER_MINUTES", buffer);
    }
    let output = cmd
        .args([
            "slots", "--date", "2024-06-03", "--open", "09:00", "--close", "11:00", "--duration",
            "30", "--booked", "2024-06-03T09:00:00Z/2024-06-03T09:30:00Z",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    stdout_json(&output)[0]["start"].as_str().unwrap().to_string()
}

#[test]
fn buffer_defaults_to_ten_minutes_unless_configured() {
    assert_eq!(first_start_after_booking(None), "2024-06-03T09:40:00Z");
    assert_eq!(first_start_after_booking(Some("0")), "2024-06-03T09:30:00Z");
}

#[test]
fn slots_accept_24_00_as_closing_time() {
    let output = salon()
        .args([
            "slots", "--date", "2024-06-03", "--open", "23:00", "--close", "24:00", "--duration",
            "60",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let slots = stdout_json(&output);
    let slots = slots.as_array().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0]["end"], "2024-06-04T00:00:00Z");
}

#[test]
fn slots_without_opening_hours_is_empty() {
    salon()
        .args(["slots", "--date", "2024-06-02", "--duration", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn zero_interval_is_rejected() {
    salon()
        .args([
            "slots", "--date", "2024-06-03", "--open", "09:00", "--close", "10:00", "--duration",
            "30", "--interval-minutes", "0",
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("slot interval"));
}

// ─────────────────────────────────────────────────────────────────────────────
// availability
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn availability_lists_each_eligible_staff_member() {
    let output = salon()
        .args([
            "--data",
            fixture_path(),
            "availability",
            "--service",
            "1",
            "--date",
            "2024-06-04",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let result = stdout_json(&output);
    let result = result.as_array().unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result[0]["staff_id"], 1);
    // Lina has 09:00-09:30 booked, so her day starts after the buffer.
    assert_eq!(result[0]["slots"][0]["start"], "2024-06-04T09:40:00Z");
    assert_eq!(result[1]["staff_id"], 2);
    assert_eq!(result[1]["slots"][0]["start"], "2024-06-04T09:00:00Z");
}

#[test]
fn availability_for_inactive_service_exits_not_found() {
    salon()
        .args([
            "--data",
            fixture_path(),
            "availability",
            "--service",
            "3",
            "--date",
            "2024-06-04",
        ])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("inactive"));
}

#[test]
fn availability_for_ineligible_staff_exits_invalid_selection() {
    salon()
        .args([
            "--data",
            fixture_path(),
            "availability",
            "--service",
            "2",
            "--staff",
            "2",
            "--date",
            "2024-06-04",
        ])
        .assert()
        .failure()
        .code(4);
}

// ─────────────────────────────────────────────────────────────────────────────
// book
// ─────────────────────────────────────────────────────────────────────────────

fn book_args<'a>(data: &'a str, staff: &'a str, start: &'a str) -> Vec<&'a str> {
    vec![
        "--data",
        data,
        "book",
        "--service",
        "1",
        "--staff",
        staff,
        "--start",
        start,
        "--name",
        "Alice Example",
        "--email",
        "alice@example.com",
        "--phone",
        "+49 30 123456",
    ]
}

#[test]
fn book_offered_slot_persists_the_booking() {
    let data = scratch_copy("book");
    let data_str = data.to_str().unwrap();

    let output = salon()
        .args(book_args(data_str, "2", "2024-06-04T09:00:00Z"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let booking = stdout_json(&output);
    assert_eq!(booking["id"], 2);
    assert_eq!(booking["starts_at"], "2024-06-04T09:00:00Z");
    assert_eq!(booking["ends_at"], "2024-06-04T09:30:00Z");
    assert_eq!(booking["status"], "confirmed");

    // Same slot again: the re-check sees the stored booking.
    salon()
        .args(book_args(data_str, "2", "2024-06-04T09:00:00Z"))
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("no longer available"));

    let _ = std::fs::remove_file(&data);
}

#[test]
fn book_inside_existing_buffer_conflicts() {
    let data = scratch_copy("buffer");

    salon()
        .args(book_args(data.to_str().unwrap(), "1", "2024-06-04T09:35:00Z"))
        .assert()
        .failure()
        .code(5);

    let _ = std::fs::remove_file(&data);
}

#[test]
fn book_with_bad_email_fails_validation() {
    let data = scratch_copy("email");
    let mut args = book_args(data.to_str().unwrap(), "2", "2024-06-04T09:00:00Z");
    args[12] = "not-an-email";

    salon().args(args).assert().failure().code(2);

    let _ = std::fs::remove_file(&data);
}

#[test]
fn concurrent_book_processes_admit_exactly_one() {
    for round in 0..5 {
        let data = scratch_copy(&format!("race-{}", round));
        let data_str = data.to_str().unwrap();

        let spawn = || {
            std::process::Command::new(assert_cmd::cargo::cargo_bin("salon"))
                .args(book_args(data_str, "2", "2024-06-04T11:00:00Z"))
                .env_remove("SALON_DATA")
                .env_remove("SALON_BUFFER_MINUTES")
                .env_remove("SALON_INTERVAL_MINUTES")
                .env_remove("RUST_LOG")
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .spawn()
                .expect("salon binary must start")
        };
        let mut first = spawn();
        let mut second = spawn();
        let mut codes = vec![
            first.wait().unwrap().code(),
            second.wait().unwrap().code(),
        ];
        codes.sort();
        assert_eq!(codes, vec![Some(0), Some(5)], "round {}", round);

        let output = salon()
            .args(["--data", data_str, "bookings", "--day", "2024-06-04"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let bookings = stdout_json(&output);
        let at_eleven = bookings
            .as_array()
            .unwrap()
            .iter()
            .filter(|b| b["staff_id"] == 2 && b["starts_at"] == "2024-06-04T11:00:00Z")
            .count();
        assert_eq!(at_eleven, 1, "round {}", round);

        let _ = std::fs::remove_file(&data);
        let _ = std::fs::remove_file(format!("{}.lock", data_str));
    }
}

#[test]
fn saving_leaves_no_temp_files_behind() {
    let dir = std::env::temp_dir().join(format!("salon-cli-tmpdir-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let data = dir.join("salon.json");
    std::fs::copy(fixture_path(), &data).unwrap();

    salon()
        .args(book_args(data.to_str().unwrap(), "2", "2024-06-04T09:00:00Z"))
        .assert()
        .success();

    let mut names: Vec<String> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["salon.json", "salon.json.lock"]);

    let _ = std::fs::remove_dir_all(&dir);
}

// ─────────────────────────────────────────────────────────────────────────────
// administration
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn services_hide_inactive_by_default() {
    salon()
        .args(["--data", fixture_path(), "services"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Colour"))
        .stdout(predicate::str::contains("Perm").not());

    salon()
        .args(["--data", fixture_path(), "services", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Perm"));
}

#[test]
fn staff_lists_members() {
    salon()
        .args(["--data", fixture_path(), "staff"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lina"))
        .stdout(predicate::str::contains("Mara"));
}

#[test]
fn hours_set_and_remove_round_trip_through_the_file() {
    let data = scratch_copy("hours");
    let data_str = data.to_str().unwrap();

    salon()
        .args(["--data", data_str, "hours", "set", "6", "10:00", "14:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"weekday\": 6"));

    salon()
        .args(["--data", data_str, "hours", "remove", "1"])
        .assert()
        .success();

    let output = salon()
        .args(["--data", data_str, "hours"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let weekdays: Vec<u64> = stdout_json(&output)
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["weekday"].as_u64().unwrap())
        .collect();
    assert_eq!(weekdays, vec![2, 6]);

    let _ = std::fs::remove_file(&data);
}

#[test]
fn hours_set_rejects_inverted_window() {
    let data = scratch_copy("hours-bad");

    salon()
        .args(["--data", data.to_str().unwrap(), "hours", "set", "3", "18:00", "09:00"])
        .assert()
        .failure()
        .code(2);

    let _ = std::fs::remove_file(&data);
}

#[test]
fn cancelling_a_booking_frees_the_slot() {
    let data = scratch_copy("cancel");
    let data_str = data.to_str().unwrap();

    salon()
        .args(["--data", data_str, "bookings", "cancel", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cancelled"));

    salon()
        .args(book_args(data_str, "1", "2024-06-04T09:00:00Z"))
        .assert()
        .success();

    let output = salon()
        .args(["--data", data_str, "bookings", "--day", "2024-06-04"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(stdout_json(&output).as_array().unwrap().len(), 2);

    let _ = std::fs::remove_file(&data);
}

#[test]
fn unknown_booking_exits_not_found() {
    let data = scratch_copy("unknown");

    salon()
        .args(["--data", data.to_str().unwrap(), "bookings", "delete", "99"])
        .assert()
        .failure()
        .code(3);

    let _ = std::fs::remove_file(&data);
}

#[test]
fn malformed_data_file_is_reported() {
    let path = std::env::temp_dir().join(format!("salon-cli-broken-{}.json", std::process::id()));
    std::fs::write(&path, "{ not json").unwrap();

    salon()
        .args(["--data", path.to_str().unwrap(), "staff"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse data file"));

    let _ = std::fs::remove_file(&path);
}
