//! Listing the fuel events of a car.
//!
//! Quantities are converted to the car's display units; the consumption
//! column is only filled for full fill-ups.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fl_core::units::{distance_for_kilometers, price_per_unit, volume_for_liters};
use fl_core::{Car, CarId, FuelEvent};
use fl_db::Database;
use rust_decimal::Decimal;
use serde::Serialize;

use super::util::format_amount;

/// A fuel event in the display units of its car.
#[derive(Debug, Clone, Serialize)]
pub struct EventEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub distance: Decimal,
    pub fuel_volume: Decimal,
    pub price: Decimal,
    pub cost: Decimal,
    pub filled_up: bool,
    pub inherited_distance: Decimal,
    pub inherited_fuel_volume: Decimal,
    pub inherited_cost: Decimal,
    pub consumption: Option<Decimal>,
    pub comment: Option<String>,
}

impl EventEntry {
    pub fn new(car: &Car, event: &FuelEvent) -> Self {
        Self {
            id: event.id.get(),
            timestamp: event.timestamp,
            distance: distance_for_kilometers(event.distance, car.odometer_unit),
            fuel_volume: volume_for_liters(event.fuel_volume, car.volume_unit),
            price: price_per_unit(event.price, car.volume_unit),
            cost: event.cost(),
            filled_up: event.filled_up,
            inherited_distance: distance_for_kilometers(event.inherited.distance, car.odometer_unit),
            inherited_fuel_volume: volume_for_liters(event.inherited.fuel_volume, car.volume_unit),
            inherited_cost: event.inherited.cost,
            consumption: event.consumption(car.consumption_unit),
            comment: event.comment.clone(),
        }
    }
}

/// JSON output structure.
#[derive(Debug, Serialize)]
pub struct JsonEvents {
    pub car_id: i64,
    pub distance_unit: &'static str,
    pub volume_unit: &'static str,
    pub consumption_unit: &'static str,
    pub events: Vec<EventEntry>,
}

/// Format events for human-readable output.
pub fn format_events(car: &Car, entries: &[EventEntry]) -> String {
    let mut output = String::new();

    if car.number_plate.is_empty() {
        writeln!(output, "{}", car.name).unwrap();
    } else {
        writeln!(output, "{} ({})", car.name, car.number_plate).unwrap();
    }
    writeln!(output).unwrap();

    if entries.is_empty() {
        writeln!(output, "No fuel events.").unwrap();
        return output;
    }

    let distance_unit = car.odometer_unit.as_str();
    let volume_unit = car.volume_unit.as_str();
    writeln!(
        output,
        "{:<4}  {:<16}  {:>10}  {:>10}  {:>7}  {:<4}  {:>10}  Consumption",
        "ID", "Date", "Distance", "Volume", "Price", "Full", "Carried"
    )
    .unwrap();
    for entry in entries {
        let consumption = entry.consumption.map_or_else(
            || "-".to_string(),
            |value| format!("{} {}", format_amount(value, 2), car.consumption_unit.label()),
        );
        let mut line = format!(
            "{:<4}  {:<16}  {:>10}  {:>10}  {:>7}  {:<4}  {:>10}  {}",
            entry.id,
            entry.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            format!("{} {distance_unit}", format_amount(entry.distance, 1)),
            format!("{} {volume_unit}", format_amount(entry.fuel_volume, 2)),
            format_amount(entry.price, 3),
            if entry.filled_up { "yes" } else { "no" },
            format!("{} {distance_unit}", format_amount(entry.inherited_distance, 1)),
            consumption,
        );
        if let Some(comment) = &entry.comment {
            write!(line, "  {comment}").unwrap();
        }
        writeln!(output, "{}", line.trim_end()).unwrap();
    }

    output
}

/// Runs the events command.
pub fn run<W: Write>(writer: &mut W, db: &Database, car_id: CarId, json: bool) -> Result<()> {
    let car = db
        .car(car_id)
        .with_context(|| format!("failed to load car {car_id}"))?
        .with_context(|| format!("unknown car: {car_id}"))?;
    let events = db
        .list_events(car_id)
        .with_context(|| format!("failed to list events of car {car_id}"))?;
    let entries: Vec<EventEntry> = events.iter().map(|event| EventEntry::new(&car, event)).collect();

    if json {
        let output = JsonEvents {
            car_id: car.id.get(),
            distance_unit: car.odometer_unit.as_str(),
            volume_unit: car.volume_unit.as_str(),
            consumption_unit: car.consumption_unit.as_str(),
            events: entries,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&output)?)?;
    } else {
        write!(writer, "{}", format_events(&car, &entries))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use fl_core::{EventStore, FuelEntry, NewCar, add_event};
    use insta::assert_snapshot;
    use rust_decimal_macros::dec;

    fn seed(db: &mut Database) -> CarId {
        let mut work = db.working_copy().unwrap();
        let car = work
            .create_car(&NewCar::for_region("Golf", "HH-AB 12", Some("DE")))
            .unwrap();
        let fill_ups = [
            (5, dec!(300), dec!(20), false, None),
            (12, dec!(450), dec!(35), true, Some("Autobahn")),
        ];
        for (day, distance, fuel_volume, filled_up, comment) in fill_ups {
            add_event(
                &mut work,
                &FuelEntry {
                    car_id: car.id,
                    timestamp: Utc.with_ymd_and_hms(2024, 2, day, 8, 30, 0).unwrap(),
                    distance,
                    fuel_volume,
                    price: dec!(1.8),
                    filled_up,
                    comment: comment.map(str::to_string),
                },
            )
            .unwrap();
        }
        work.commit().unwrap();
        car.id
    }

    #[test]
    fn events_show_carried_amounts_and_consumption() {
        let mut db = Database::open_in_memory().unwrap();
        let car = seed(&mut db);

        let mut output = Vec::new();
        run(&mut output, &db, car, false).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Golf (HH-AB 12)

        ID    Date                Distance      Volume    Price  Full     Carried  Consumption
        1     2024-02-05 08:30    300.0 km     20.00 l    1.800  no        0.0 km  -
        2     2024-02-12 08:30    450.0 km     35.00 l    1.800  yes     300.0 km  7.33 l/100km  Autobahn
        ");
    }

    #[test]
    fn events_json_includes_inherited_values() {
        let mut db = Database::open_in_memory().unwrap();
        let car = seed(&mut db);

        let mut output = Vec::new();
        run(&mut output, &db, car, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["volume_unit"], "l");
        assert_eq!(value["events"][1]["inherited_distance"], "300");
        assert_eq!(value["events"][1]["consumption"], "7.33");
        assert_eq!(value["events"][0]["consumption"], serde_json::Value::Null);
    }

    #[test]
    fn unknown_car_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        let err = run(&mut Vec::new(), &db, CarId::new(9).unwrap(), false).unwrap_err();
        assert_eq!(err.to_string(), "unknown car: 9");
    }
}
