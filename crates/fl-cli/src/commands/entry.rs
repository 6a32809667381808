//! Recording, editing and removing single fill-ups.
//!
//! Values on the command line are in the car's display units and are
//! converted to kilometers, liters and price per liter before they reach
//! the ledger.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::Args;
use fl_core::normalize::NOON_OFFSET_SECONDS;
use fl_core::units::{kilometers_for_distance, liters_for_volume, price_per_liter};
use fl_core::{
    Car, CarId, EventId, EventStore, FuelEntry, FuelEvent, ValidationError, add_event,
    remove_event, replace_event,
};
use fl_db::Database;
use rust_decimal::Decimal;

use super::util::require_car;

#[derive(Debug, Clone, Args)]
pub struct EntryArgs {
    /// Day of the fill-up (YYYY-MM-DD).
    #[arg(long)]
    pub date: NaiveDate,

    /// Time of day (HH:MM). Defaults to noon.
    #[arg(long, value_parser = parse_time)]
    pub time: Option<NaiveTime>,

    /// Distance driven since the previous fill-up, in the car's odometer unit.
    #[arg(long)]
    pub distance: Decimal,

    /// Fuel added, in the car's volume unit.
    #[arg(long)]
    pub volume: Decimal,

    /// Price per volume unit.
    #[arg(long)]
    pub price: Decimal,

    /// The tank was not filled completely.
    #[arg(long)]
    pub partial: bool,

    #[arg(long)]
    pub comment: Option<String>,
}

fn parse_time(text: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(text, "%H:%M")
}

impl EntryArgs {
    /// Converts the arguments to a canonical entry for `car`.
    pub fn to_entry(&self, car: &Car) -> Result<FuelEntry, ValidationError> {
        for (field, value) in [
            ("distance", self.distance),
            ("volume", self.volume),
            ("price", self.price),
        ] {
            if value < Decimal::ZERO {
                return Err(ValidationError::Negative { field });
            }
        }

        let time = self
            .time
            .or_else(|| NaiveTime::from_num_seconds_from_midnight_opt(NOON_OFFSET_SECONDS, 0))
            .unwrap_or_default();
        let comment = self
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|comment| !comment.is_empty())
            .map(str::to_string);

        Ok(FuelEntry {
            car_id: car.id,
            timestamp: self.date.and_time(time).and_utc(),
            distance: kilometers_for_distance(self.distance, car.odometer_unit),
            fuel_volume: liters_for_volume(self.volume, car.volume_unit),
            price: price_per_liter(self.price, car.volume_unit),
            filled_up: !self.partial,
            comment,
        })
    }
}

/// Records a new fill-up for a car.
pub fn add<W: Write>(writer: &mut W, db: &mut Database, car_id: CarId, args: &EntryArgs) -> Result<FuelEvent> {
    let mut work = db.working_copy().context("failed to open database transaction")?;
    let car = require_car(&work, car_id)?;
    let entry = args.to_entry(&car)?;
    let event = add_event(&mut work, &entry).context("failed to record fill-up")?;
    work.commit().context("failed to save fill-up")?;

    writeln!(writer, "Added event {} to car {}", event.id, car.id)?;
    Ok(event)
}

/// Replaces the values of an existing fill-up.
///
/// The event keeps its car but is stored under a new ID.
pub fn edit<W: Write>(writer: &mut W, db: &mut Database, event_id: EventId, args: &EntryArgs) -> Result<FuelEvent> {
    let mut work = db.working_copy().context("failed to open database transaction")?;
    let existing = work
        .event(event_id)
        .with_context(|| format!("failed to load event {event_id}"))?
        .with_context(|| format!("unknown fuel event: {event_id}"))?;
    let car = require_car(&work, existing.car_id)?;
    let entry = args.to_entry(&car)?;
    let event = replace_event(&mut work, event_id, &entry).context("failed to update fill-up")?;
    work.commit().context("failed to save fill-up")?;

    writeln!(writer, "Updated event {event_id} (now {})", event.id)?;
    Ok(event)
}

/// Deletes a fill-up.
pub fn remove<W: Write>(writer: &mut W, db: &mut Database, event_id: EventId) -> Result<FuelEvent> {
    let mut work = db.working_copy().context("failed to open database transaction")?;
    let event = remove_event(&mut work, event_id).context("failed to remove fill-up")?;
    work.commit().context("failed to save removal")?;

    writeln!(writer, "Removed event {} from car {}", event.id, event.car_id)?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    use fl_core::{DistanceUnit, NewCar, VolumeUnit};
    use insta::assert_snapshot;
    use rust_decimal_macros::dec;

    fn car_in(db: &mut Database, region: &str) -> CarId {
        let mut work = db.working_copy().unwrap();
        let car = work
            .create_car(&NewCar::for_region("Test", "T 1", Some(region)))
            .unwrap();
        work.commit().unwrap();
        car.id
    }

    fn args(date: &str, distance: Decimal, partial: bool) -> EntryArgs {
        EntryArgs {
            date: date.parse().unwrap(),
            time: None,
            distance,
            volume: dec!(10),
            price: dec!(2),
            partial,
            comment: None,
        }
    }

    #[test]
    fn entry_converts_display_units() {
        let mut db = Database::open_in_memory().unwrap();
        let id = car_in(&mut db, "US");
        let car = db.car(id).unwrap().unwrap();
        assert_eq!(car.odometer_unit, DistanceUnit::StatuteMile);
        assert_eq!(car.volume_unit, VolumeUnit::GallonUs);

        let entry = args("2024-06-01", dec!(100), false).to_entry(&car).unwrap();
        assert_eq!(entry.distance, dec!(160.9344));
        assert_eq!(entry.fuel_volume, dec!(37.85411784));
        assert_eq!(entry.cost().round_dp(6), dec!(20));
        assert_eq!(entry.timestamp.to_rfc3339(), "2024-06-01T12:00:00+00:00");
    }

    #[test]
    fn entry_rejects_negative_values() {
        let mut db = Database::open_in_memory().unwrap();
        let id = car_in(&mut db, "DE");
        let car = db.car(id).unwrap().unwrap();
        let err = args("2024-06-01", dec!(-1), false).to_entry(&car).unwrap_err();
        assert_eq!(err, ValidationError::Negative { field: "distance" });
    }

    #[test]
    fn add_edit_remove_keep_ledger_consistent() {
        let mut db = Database::open_in_memory().unwrap();
        let car = car_in(&mut db, "DE");
        let mut output = Vec::new();

        let partial = add(&mut output, &mut db, car, &args("2024-06-01", dec!(200), true)).unwrap();
        let full = add(&mut output, &mut db, car, &args("2024-06-08", dec!(300), false)).unwrap();
        assert_eq!(full.inherited.distance, dec!(200));

        let edited = edit(&mut output, &mut db, partial.id, &args("2024-06-01", dec!(250), true)).unwrap();
        let events = db.list_events(car).unwrap();
        assert_eq!(events[1].inherited.distance, dec!(250));

        remove(&mut output, &mut db, edited.id).unwrap();
        let events = db.list_events(car).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].inherited.distance, dec!(0));
        assert_eq!(db.car(car).unwrap().unwrap().distance_total_sum, dec!(300));

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Added event 1 to car 1
        Added event 2 to car 1
        Updated event 1 (now 3)
        Removed event 3 from car 1
        ");
    }

    #[test]
    fn add_rejects_cost_too_large_to_store() {
        let mut db = Database::open_in_memory().unwrap();
        let car = car_in(&mut db, "DE");
        let mut costly = args("2024-06-01", dec!(200), false);
        costly.volume = dec!(100000000000000000000);
        costly.price = dec!(10000000000);

        let err = add(&mut Vec::new(), &mut db, car, &costly).unwrap_err();
        assert!(format!("{err:#}").contains("too large"));
        assert!(db.list_events(car).unwrap().is_empty());
    }

    #[test]
    fn add_rejects_duplicate_timestamp() {
        let mut db = Database::open_in_memory().unwrap();
        let car = car_in(&mut db, "DE");
        add(&mut Vec::new(), &mut db, car, &args("2024-06-01", dec!(200), false)).unwrap();
        let err = add(&mut Vec::new(), &mut db, car, &args("2024-06-01", dec!(100), false)).unwrap_err();
        assert!(format!("{err:#}").contains("already has a fuel event"));
        assert_eq!(db.list_events(car).unwrap().len(), 1);
    }
}
