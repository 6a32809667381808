//! End-to-end integration tests for the fuel log binary.
//!
//! Tests the full pipeline: import → list → add/edit/remove → recompute,
//! each step as a separate process against one database file.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn fl_binary() -> String {
    env!("CARGO_BIN_EXE_fl").to_string()
}

/// Runs `fl` with an isolated home directory and database.
fn fl(temp: &Path, args: &[&str]) -> Output {
    Command::new(fl_binary())
        .env("HOME", temp)
        .env("XDG_CONFIG_HOME", temp.join(".config"))
        .env("FL_DATABASE_PATH", temp.join("data/fl.db"))
        .env("FL_LOCALE", "de_DE")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run fl")
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "fl should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn json_of(output: &Output) -> serde_json::Value {
    serde_json::from_str(&stdout_of(output)).unwrap()
}

const NATIVE_EXPORT: &str = "\
yyyy-MM-dd;HH:mm;Kilometers;Liters;Full Fill-Up;Price per Liter;Liters per 100 Kilometers;Comment
2024-01-05;08:15;\"512,30\";\"38,20\";Yes;\"1,799\";\"7,46\";
2024-01-12;18:00;\"220,00\";\"15,00\";No;\"1,759\";;Halbvoll
2024-01-19;17:40;\"430,00\";\"33,10\";Yes;\"1,769\";\"7,42\";Urlaub
";

/// Importing a native export creates one car named after the file.
#[test]
fn test_import_native_export() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("Golf__HH-AB12.csv");
    std::fs::write(&file, NATIVE_EXPORT).unwrap();

    let output = fl(temp.path(), &["import", file.to_str().unwrap()]);
    assert_eq!(
        stdout_of(&output),
        "Imported 3 events for 1 cars (native format)\n"
    );

    let cars = json_of(&fl(temp.path(), &["cars", "list", "--json"]));
    let cars = cars.as_array().unwrap();
    assert_eq!(cars.len(), 1);
    assert_eq!(cars[0]["name"], "Golf");
    assert_eq!(cars[0]["number_plate"], "HH-AB12");
    assert_eq!(cars[0]["distance_total"], "1162.30");

    let events = json_of(&fl(temp.path(), &["events", "1", "--json"]));
    let events = events["events"].as_array().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[1]["filled_up"], false);
    assert_eq!(events[1]["comment"], "Halbvoll");
    assert_eq!(events[2]["inherited_distance"], "220.00");
}

/// Rows in a Mac Roman file are read just like UTF-8 ones.
#[test]
fn test_import_mac_roman_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("Clio__PARIS1.csv");
    let mut bytes = b"Date;Kilom\x8Ftres;Litres;R\x8Eservoir plein;Prix par litre\n".to_vec();
    bytes.extend_from_slice(b"2024-02-01;600;42;1;1,85\n");
    std::fs::write(&file, bytes).unwrap();

    let output = fl(temp.path(), &["import", file.to_str().unwrap()]);
    assert_eq!(
        stdout_of(&output),
        "Imported 1 events for 1 cars (native format)\n"
    );
}

/// A file without any fuel events fails and leaves the database empty.
#[test]
fn test_import_without_events_fails() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("empty.csv");
    std::fs::write(&file, "Datum;Kilometer;Liter;Preis\n").unwrap();

    let output = fl(temp.path(), &["import", file.to_str().unwrap()]);
    assert!(!output.status.success());

    let status = stdout_of(&fl(temp.path(), &["status"]));
    assert!(status.contains("No cars recorded."), "{status}");
}

/// Manual entries keep the carried amounts in step with a rebuild.
#[test]
fn test_manual_entries_and_recompute() {
    let temp = TempDir::new().unwrap();

    let created = stdout_of(&fl(
        temp.path(),
        &["cars", "create", "--name", "Polo", "--plate", "B-XY 99", "--odometer", "10000"],
    ));
    assert_eq!(created, "Created car 1 (Polo)\n");

    let add = |date: &str, distance: &str, partial: bool| {
        let mut args = vec![
            "add", "1", "--date", date, "--distance", distance, "--volume", "20", "--price", "1.5",
        ];
        if partial {
            args.push("--partial");
        }
        stdout_of(&fl(temp.path(), &args))
    };
    assert_eq!(add("2024-04-01", "300", true), "Added event 1 to car 1\n");
    assert_eq!(add("2024-04-08", "280", false), "Added event 2 to car 1\n");
    assert_eq!(add("2024-04-04", "150", true), "Added event 3 to car 1\n");

    let events = json_of(&fl(temp.path(), &["events", "1", "--json"]));
    assert_eq!(events["events"][2]["inherited_distance"], "450");

    let removed = stdout_of(&fl(temp.path(), &["remove", "1"]));
    assert_eq!(removed, "Removed event 1 from car 1\n");
    let events = json_of(&fl(temp.path(), &["events", "1", "--json"]));
    assert_eq!(events["events"][1]["inherited_distance"], "150");

    let recomputed = stdout_of(&fl(temp.path(), &["recompute", "1"]));
    assert_eq!(
        recomputed,
        "Recomputed car 1 (Polo): 430.0 km driven, 40.00 l fuel\n"
    );

    let status = stdout_of(&fl(temp.path(), &["status"]));
    assert!(status.contains("Cars: 1"));
    assert!(status.contains("Fuel events: 2"));
}

/// Editing an event onto another event's timestamp is rejected.
#[test]
fn test_edit_rejects_duplicate_timestamp() {
    let temp = TempDir::new().unwrap();
    stdout_of(&fl(
        temp.path(),
        &["cars", "create", "--name", "Polo", "--plate", "B-XY 99"],
    ));
    for date in ["2024-04-01", "2024-04-08"] {
        stdout_of(&fl(
            temp.path(),
            &["add", "1", "--date", date, "--distance", "300", "--volume", "20", "--price", "1.5"],
        ));
    }

    let output = fl(
        temp.path(),
        &["edit", "2", "--date", "2024-04-01", "--distance", "300", "--volume", "20", "--price", "1.5"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already has a fuel event"));

    let events = json_of(&fl(temp.path(), &["events", "1", "--json"]));
    assert_eq!(events["events"].as_array().unwrap().len(), 2);
}
