//! Car listing and creation.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use fl_core::units::{distance_for_kilometers, kilometers_for_distance, volume_for_liters};
use fl_core::{Car, ConsumptionUnit, DistanceUnit, EventStore, Locale, NewCar, ValidationError, VolumeUnit};
use fl_db::Database;
use rust_decimal::Decimal;
use serde::Serialize;

use super::util::format_amount;

#[derive(Debug, Args)]
pub struct CreateCarArgs {
    /// Display name, e.g. the model.
    #[arg(long)]
    pub name: String,

    /// Number plate.
    #[arg(long)]
    pub plate: String,

    /// Unit of odometer readings and trip distances (km, mi).
    #[arg(long)]
    pub odometer_unit: Option<DistanceUnit>,

    /// Unit of fuel volumes and prices (l, gal_us, gal_uk).
    #[arg(long)]
    pub volume_unit: Option<VolumeUnit>,

    /// Unit consumption is reported in (l_per_100km, km_per_l, mpg_us, ...).
    #[arg(long)]
    pub consumption_unit: Option<ConsumptionUnit>,

    /// Current odometer reading in the odometer unit.
    #[arg(long)]
    pub odometer: Option<Decimal>,
}

/// A car as listed, with quantities in its display units.
#[derive(Debug, Clone, Serialize)]
pub struct CarEntry {
    pub id: i64,
    pub name: String,
    pub number_plate: String,
    pub odometer: Decimal,
    pub distance_total: Decimal,
    pub fuel_volume_total: Decimal,
    pub odometer_unit: &'static str,
    pub volume_unit: &'static str,
    pub consumption_unit: &'static str,
}

impl From<&Car> for CarEntry {
    fn from(car: &Car) -> Self {
        Self {
            id: car.id.get(),
            name: car.name.clone(),
            number_plate: car.number_plate.clone(),
            odometer: distance_for_kilometers(car.odometer, car.odometer_unit),
            distance_total: distance_for_kilometers(car.distance_total_sum, car.odometer_unit),
            fuel_volume_total: volume_for_liters(car.fuel_volume_total_sum, car.volume_unit),
            odometer_unit: car.odometer_unit.as_str(),
            volume_unit: car.volume_unit.as_str(),
            consumption_unit: car.consumption_unit.as_str(),
        }
    }
}

/// Format cars for human-readable output.
pub fn format_cars(entries: &[CarEntry]) -> String {
    let mut output = String::new();

    writeln!(output, "CARS").unwrap();
    writeln!(output).unwrap();

    if entries.is_empty() {
        writeln!(output, "No cars yet.").unwrap();
        writeln!(output).unwrap();
        writeln!(
            output,
            "Hint: Run 'fl import <file>' or 'fl cars create' to add one."
        )
        .unwrap();
        return output;
    }

    writeln!(
        output,
        "{:<4}  {:<15}  {:<15}  {:>12}  {:>12}  Fuel",
        "ID", "Name", "Plate", "Odometer", "Distance"
    )
    .unwrap();
    for entry in entries {
        let odometer = format!("{} {}", format_amount(entry.odometer, 1), entry.odometer_unit);
        let distance = format!(
            "{} {}",
            format_amount(entry.distance_total, 1),
            entry.odometer_unit
        );
        writeln!(
            output,
            "{:<4}  {:<15}  {:<15}  {:>12}  {:>12}  {} {}",
            entry.id,
            entry.name,
            entry.number_plate,
            odometer,
            distance,
            format_amount(entry.fuel_volume_total, 2),
            entry.volume_unit
        )
        .unwrap();
    }

    output
}

/// Lists all cars.
pub fn list<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let cars = db.list_cars().context("failed to list cars")?;
    let entries: Vec<CarEntry> = cars.iter().map(CarEntry::from).collect();

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
    } else {
        write!(writer, "{}", format_cars(&entries))?;
    }
    Ok(())
}

/// Creates a car listed after all existing ones.
///
/// Units not given on the command line follow the region of `locale`.
pub fn create<W: Write>(
    writer: &mut W,
    db: &mut Database,
    args: &CreateCarArgs,
    locale: &Locale,
) -> Result<Car> {
    let mut car = NewCar::for_region(args.name.trim(), args.plate.trim(), locale.region());
    if let Some(unit) = args.odometer_unit {
        car.odometer_unit = unit;
    }
    if let Some(unit) = args.volume_unit {
        car.volume_unit = unit;
    }
    if let Some(unit) = args.consumption_unit {
        car.consumption_unit = unit;
    }
    if let Some(odometer) = args.odometer {
        if odometer < Decimal::ZERO {
            return Err(ValidationError::Negative { field: "odometer" }.into());
        }
        car.odometer = kilometers_for_distance(odometer, car.odometer_unit);
    }

    let mut work = db.working_copy().context("failed to open database transaction")?;
    let existing = work.cars().context("failed to list cars")?;
    car.order = existing.iter().map(|car| car.order + 1).max().unwrap_or(0);
    let created = work.create_car(&car).context("failed to create car")?;
    work.commit().context("failed to save car")?;

    tracing::info!(car = %created.id, name = %created.name, "created car");
    writeln!(writer, "Created car {} ({})", created.id, created.name)?;
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use rust_decimal_macros::dec;

    fn create_args(name: &str, plate: &str) -> CreateCarArgs {
        CreateCarArgs {
            name: name.to_string(),
            plate: plate.to_string(),
            odometer_unit: None,
            volume_unit: None,
            consumption_unit: None,
            odometer: None,
        }
    }

    #[test]
    fn create_uses_region_defaults_and_lists_last() {
        let mut db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        let locale = Locale::from_tag("en_US");

        create(&mut output, &mut db, &create_args("Civic", "7ABC123"), &locale).unwrap();
        let mut args = create_args("Golf", "HH-AB 12");
        args.odometer_unit = Some(DistanceUnit::Kilometer);
        args.volume_unit = Some(VolumeUnit::Liter);
        args.odometer = Some(dec!(1000));
        let golf = create(&mut output, &mut db, &args, &locale).unwrap();

        assert_eq!(golf.order, 1);
        assert_eq!(golf.odometer, dec!(1000));
        assert_eq!(golf.consumption_unit, ConsumptionUnit::MilesPerGallonUs);

        let cars = db.list_cars().unwrap();
        assert_eq!(cars[0].volume_unit, VolumeUnit::GallonUs);
        assert_eq!(cars[1].name, "Golf");

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Created car 1 (Civic)
        Created car 2 (Golf)
        ");
    }

    #[test]
    fn create_rejects_negative_odometer() {
        let mut db = Database::open_in_memory().unwrap();
        let mut args = create_args("Golf", "");
        args.odometer = Some(dec!(-5));
        let err = create(&mut Vec::new(), &mut db, &args, &Locale::posix()).unwrap_err();
        assert!(err.to_string().contains("odometer"));
        assert!(db.list_cars().unwrap().is_empty());
    }

    #[test]
    fn list_shows_totals_in_display_units() {
        let mut db = Database::open_in_memory().unwrap();
        let mut args = create_args("Mustang", "CA 5XYZ");
        args.odometer_unit = Some(DistanceUnit::StatuteMile);
        args.volume_unit = Some(VolumeUnit::GallonUs);
        args.odometer = Some(dec!(250));
        create(&mut Vec::new(), &mut db, &args, &Locale::posix()).unwrap();

        let mut output = Vec::new();
        list(&mut output, &db, false).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        CARS

        ID    Name             Plate                Odometer      Distance  Fuel
        1     Mustang          CA 5XYZ              250.0 mi        0.0 mi  0.00 gal_us
        ");
    }

    #[test]
    fn list_empty_shows_hint() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        list(&mut output, &db, false).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        CARS

        No cars yet.

        Hint: Run 'fl import <file>' or 'fl cars create' to add one.
        ");
    }

    #[test]
    fn list_json_uses_unit_tags() {
        let mut db = Database::open_in_memory().unwrap();
        create(
            &mut Vec::new(),
            &mut db,
            &create_args("Golf", "HH-AB 12"),
            &Locale::from_tag("de_DE"),
        )
        .unwrap();

        let mut output = Vec::new();
        list(&mut output, &db, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value[0]["name"], "Golf");
        assert_eq!(value[0]["odometer_unit"], "km");
        assert_eq!(value[0]["consumption_unit"], "l_per_100km");
    }
}
