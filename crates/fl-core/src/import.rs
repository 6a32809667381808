//! Importing fuel logs from CSV exports.
//!
//! The text is scanned twice. The first pass collects car tables; if none
//! exist the file is treated as a native single-car export and one car is
//! named after the file. The second pass reads every event table, orders
//! its records per car and feeds them through the ledger.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::disambiguate::guess_distance;
use crate::ledger::LedgerRun;
use crate::model::{Car, FuelEntry, NewCar};
use crate::normalize::Normalizer;
use crate::sequence::{SortKey, TimestampNudger, sort_chronologically};
use crate::sniff::{CarColumns, Dialect, EventColumns, VolumeColumn};
use crate::store::EventStore;
use crate::tabular::{Record, Table, TableParser};
use crate::units::{kilometers_for_distance, liters_for_volume, price_per_liter};

/// Longest car name or number plate taken from an import.
pub const MAX_NAME_LENGTH: usize = 15;

/// Name given to imported cars without a model.
pub const IMPORTED_CAR_NAME: &str = "Imported Car";

/// Fraction digits of prices derived from TankPro total costs.
pub const DERIVED_PRICE_SCALE: u32 = 3;

/// Registry key of the car synthesized for native exports.
const FALLBACK_CAR_KEY: i64 = 0;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not find any table in the input")]
    NoTables,

    #[error("no fuel events found in the input")]
    NoEvents,

    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ImportError {
    fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(err))
    }
}

/// Outcome of a successful import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub dialect: Dialect,
    /// Cars created by the import.
    pub cars: usize,
    /// Fuel events created by the import.
    pub events: usize,
    /// Records of event tables that could not be placed, were incomplete
    /// or held amounts too large to add up.
    pub skipped: usize,
    /// TankPro records up to and including each car's first full fill-up.
    pub baseline: usize,
}

#[derive(Debug, Clone, Default)]
struct CarIdentity {
    model: Option<String>,
    plate: Option<String>,
}

/// A record of an event table with its parsed sort key.
struct Row<'a> {
    record: &'a Record,
    timestamp: DateTime<Utc>,
    odometer: Option<Decimal>,
}

/// What happened to one record of an event table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Imported,
    /// Part of the history before a TankPro car's first full fill-up.
    Baseline,
    Skipped,
}

/// Record counts of one event table.
#[derive(Debug, Clone, Copy, Default)]
struct TableCounts {
    imported: usize,
    skipped: usize,
    baseline: usize,
}

/// Per-car progress through one event table.
struct CarImport {
    nudger: TimestampNudger,
    run: LedgerRun,
    odometer: Decimal,
    baseline_seen: bool,
    events: usize,
}

impl CarImport {
    fn new() -> Self {
        Self {
            nudger: TimestampNudger::new(),
            run: LedgerRun::new(),
            odometer: Decimal::ZERO,
            baseline_seen: false,
            events: 0,
        }
    }
}

/// Imports CSV text into an [`EventStore`].
///
/// The store should be a private working copy: on error, partially created
/// cars and events are left behind for the caller to discard.
#[derive(Debug, Clone)]
pub struct Importer {
    normalizer: Normalizer,
}

impl Importer {
    pub const fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    /// Imports `text`. `source_name` is the file name the text came from and
    /// is only used to name the car of a native export.
    pub fn import<S: EventStore>(
        &self,
        store: &mut S,
        text: &str,
        source_name: &str,
    ) -> Result<ImportSummary, ImportError> {
        let mut parser = TableParser::new(text);

        let mut tables = 0_usize;
        let mut registry: BTreeMap<i64, CarIdentity> = BTreeMap::new();
        for table in parser.by_ref() {
            tables += 1;
            self.register_cars(&table, &mut registry);
        }
        if tables == 0 {
            return Err(ImportError::NoTables);
        }

        let dialect = if registry.is_empty() {
            registry.insert(FALLBACK_CAR_KEY, identity_from_file_name(source_name));
            Dialect::Native
        } else {
            Dialect::TankPro
        };
        debug!(tables, cars = registry.len(), %dialect, "scanned input");

        let mut cars = self.create_cars(store, &registry)?;

        parser.rewind();
        let mut events = 0;
        let mut skipped = 0;
        let mut baseline = 0;
        for table in parser {
            if table.records.is_empty() {
                continue;
            }
            let Some(columns) = EventColumns::detect(&table.header, dialect) else {
                continue;
            };
            let counts = self.import_table(store, &table, &columns, dialect, &mut cars)?;
            events += counts.imported;
            skipped += counts.skipped;
            baseline += counts.baseline;
        }

        for car in cars.values() {
            store.update_car(car).map_err(ImportError::store)?;
        }

        if events == 0 {
            return Err(ImportError::NoEvents);
        }

        info!(cars = cars.len(), events, skipped, baseline, %dialect, "imported fuel log");
        Ok(ImportSummary {
            dialect,
            cars: cars.len(),
            events,
            skipped,
            baseline,
        })
    }

    /// Adds the cars of a car table to `registry`. The first definition of
    /// an ID wins.
    fn register_cars(&self, table: &Table, registry: &mut BTreeMap<i64, CarIdentity>) {
        if table.records.is_empty() {
            return;
        }
        let Some(columns) = CarColumns::detect(&table.header) else {
            return;
        };

        for record in &table.records {
            let Some(id) = record
                .get(&columns.id)
                .and_then(|text| self.normalizer.parse_number(text))
                .and_then(|number| number.trunc().to_i64())
            else {
                continue;
            };
            let (Some(model), Some(plate)) = (record.get(&columns.model), record.get(&columns.plate))
            else {
                continue;
            };
            registry.entry(id).or_insert_with(|| CarIdentity {
                model: Some(model.to_string()),
                plate: Some(plate.to_string()),
            });
        }
    }

    /// Creates one car per registry entry and lists them before the cars
    /// that already exist.
    fn create_cars<S: EventStore>(
        &self,
        store: &mut S,
        registry: &BTreeMap<i64, CarIdentity>,
    ) -> Result<BTreeMap<i64, Car>, ImportError> {
        let existing = store.cars().map_err(ImportError::store)?;
        let region = self.normalizer.current().region();

        let mut cars = BTreeMap::new();
        for (order, (key, identity)) in (0_i64..).zip(registry) {
            let name = identity.model.as_deref().map_or_else(
                || IMPORTED_CAR_NAME.to_string(),
                truncate_name,
            );
            let plate = identity.plate.as_deref().map(truncate_name).unwrap_or_default();
            let mut new_car = NewCar::for_region(name, plate, region);
            new_car.order = order;
            let car = store.create_car(&new_car).map_err(ImportError::store)?;
            debug!(car = %car.id, key, name = %car.name, "created car");
            cars.insert(*key, car);
        }

        let shift = i64::try_from(cars.len()).unwrap_or(i64::MAX);
        for mut car in existing {
            car.order = car.order.saturating_add(shift);
            store.update_car(&car).map_err(ImportError::store)?;
        }

        Ok(cars)
    }

    /// Imports the records of one event table.
    fn import_table<S: EventStore>(
        &self,
        store: &mut S,
        table: &Table,
        columns: &EventColumns,
        dialect: Dialect,
        cars: &mut BTreeMap<i64, Car>,
    ) -> Result<TableCounts, ImportError> {
        let mut counts = TableCounts::default();
        let mut rows: Vec<Row<'_>> = Vec::with_capacity(table.records.len());
        for record in &table.records {
            let time = columns.time.as_deref().and_then(|name| record.get(name));
            let timestamp = record
                .get(&columns.date)
                .and_then(|date| self.normalizer.parse_date(date, time));
            let Some(timestamp) = timestamp else {
                counts.skipped += 1;
                continue;
            };
            let odometer = columns
                .odometer
                .as_ref()
                .and_then(|column| self.number(record, &column.name));
            rows.push(Row {
                record,
                timestamp,
                odometer,
            });
        }
        sort_chronologically(&mut rows, |row| SortKey {
            timestamp: Some(row.timestamp),
            odometer: row.odometer,
        });

        for (key, car) in cars.iter_mut() {
            let mut progress = CarImport::new();
            for row in &rows {
                if dialect == Dialect::TankPro {
                    let row_car = columns
                        .car_id
                        .as_deref()
                        .and_then(|name| self.number(row.record, name));
                    if row_car != Some(Decimal::from(*key)) {
                        continue;
                    }
                }

                match self.import_row(store, row, columns, dialect, car, &mut progress)? {
                    RowOutcome::Imported => {}
                    RowOutcome::Baseline => counts.baseline += 1,
                    RowOutcome::Skipped => counts.skipped += 1,
                }
            }

            if progress.events > 0 {
                car.odometer = progress.odometer.max(car.distance_total_sum);
            }
            debug!(car = %car.id, events = progress.events, "imported table rows");
            counts.imported += progress.events;
        }

        Ok(counts)
    }

    /// Imports one record for `car`.
    ///
    /// Amounts that do not fit a [`Decimal`] once multiplied or summed up
    /// skip the record like an unreadable field.
    fn import_row<S: EventStore>(
        &self,
        store: &mut S,
        row: &Row<'_>,
        columns: &EventColumns,
        dialect: Dialect,
        car: &mut Car,
        progress: &mut CarImport,
    ) -> Result<RowOutcome, ImportError> {
        let record = row.record;
        let Some(timestamp) = progress.nudger.place(row.timestamp) else {
            return Ok(RowOutcome::Skipped);
        };

        let distance = if let Some(trip) = &columns.trip {
            self.number(record, &trip.name)
                .map(|distance| kilometers_for_distance(distance, trip.unit))
        } else if let Some(column) = &columns.odometer {
            self.number(record, &column.name).and_then(|reading| {
                let kilometers = kilometers_for_distance(reading, column.unit);
                let distance = kilometers.checked_sub(progress.odometer);
                progress.odometer = kilometers;
                distance
            })
        } else {
            None
        };

        let (volume, volume_unit) = match &columns.volume {
            VolumeColumn::Fixed(column) => (self.number(record, &column.name), column.unit),
            VolumeColumn::Amount { amount, unit } => (
                self.number(record, amount),
                self.normalizer.parse_volume_unit(record.get(unit)),
            ),
        };
        let volume = volume.map(|volume| liters_for_volume(volume, volume_unit));

        let price = self.number(record, &columns.price);
        let price = if dialect == Dialect::TankPro {
            // TankPro stores the total cost of the fill-up.
            match (price, volume) {
                (Some(cost), Some(liters)) if !liters.is_zero() => cost
                    .checked_div(liters)
                    .map(|price| {
                        price.round_dp_with_strategy(DERIVED_PRICE_SCALE, RoundingStrategy::AwayFromZero)
                    })
                    .unwrap_or_default(),
                _ => Decimal::ZERO,
            }
        } else {
            price
                .map(|price| price_per_liter(price, volume_unit))
                .unwrap_or_default()
        };

        let filled_up = self
            .normalizer
            .parse_bool(columns.fill_up.as_deref().and_then(|name| record.get(name)));
        let comment = columns
            .comment
            .as_deref()
            .and_then(|name| record.get(name))
            .filter(|comment| !comment.is_empty())
            .map(str::to_string);

        if dialect == Dialect::TankPro && !progress.baseline_seen {
            progress.baseline_seen = filled_up;
            return Ok(RowOutcome::Baseline);
        }

        let (Some(distance), Some(volume)) = (distance, volume) else {
            return Ok(RowOutcome::Skipped);
        };
        if distance <= Decimal::ZERO || volume <= Decimal::ZERO {
            return Ok(RowOutcome::Skipped);
        }
        if store
            .contains_event(car.id, timestamp)
            .map_err(ImportError::store)?
        {
            return Ok(RowOutcome::Skipped);
        }

        let entry = FuelEntry {
            car_id: car.id,
            timestamp,
            distance: guess_distance(distance, volume),
            fuel_volume: volume,
            price,
            filled_up,
            comment,
        };
        let totals = entry.checked_amounts().and_then(|amounts| {
            let distance = car.distance_total_sum.checked_add(entry.distance)?;
            let fuel_volume = car.fuel_volume_total_sum.checked_add(entry.fuel_volume)?;
            let mut run = progress.run;
            let inherited = run.try_advance(filled_up, amounts)?;
            Some((distance, fuel_volume, run, inherited))
        });
        let Some((distance_total_sum, fuel_volume_total_sum, run, inherited)) = totals else {
            debug!(car = %car.id, %timestamp, "skipping record with oversized amounts");
            return Ok(RowOutcome::Skipped);
        };
        store
            .create_event(&entry, inherited)
            .map_err(ImportError::store)?;

        progress.run = run;
        car.distance_total_sum = distance_total_sum;
        car.fuel_volume_total_sum = fuel_volume_total_sum;
        progress.nudger.accept(timestamp);
        progress.events += 1;
        Ok(RowOutcome::Imported)
    }

    fn number(&self, record: &Record, column: &str) -> Option<Decimal> {
        record
            .get(column)
            .and_then(|text| self.normalizer.parse_number(text))
    }
}

/// Guesses model and plate from a file name like `Golf__HH-AB 12.csv`.
fn identity_from_file_name(source_name: &str) -> CarIdentity {
    let stem = Path::new(source_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parts: Vec<&str> = stem.split("__").collect();

    let model = match parts.as_slice() {
        [model, _] if !model.is_empty() => Some(truncate_name(model)),
        _ => None,
    };
    let plate = match parts.as_slice() {
        [.., plate] if parts.len() <= 2 && !plate.is_empty() => Some(truncate_name(plate)),
        _ => None,
    };
    CarIdentity { model, plate }
}

fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_NAME_LENGTH).collect()
}
