//! Storage layer for the fuel log.
//!
//! Provides persistence for cars and fuel events using `rusqlite`, and
//! implements [`EventStore`] so the ledger and the importer can run
//! directly against the database.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! All mutations go through a [`WorkingCopy`], a single SQLite transaction.
//! Nothing it writes is visible to other connections until
//! [`WorkingCopy::commit`]; dropping it rolls everything back.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 UTC format with millisecond
//! precision (e.g., `2024-01-15T10:30:00.000Z`). The fixed width keeps
//! lexicographic ordering equal to chronological ordering, which range
//! queries rely on.
//!
//! ## Quantities
//!
//! Distances, volumes, prices and costs are stored as decimal TEXT in
//! canonical units (kilometers, liters, price per liter) so no precision is
//! lost to floating point. Unit columns hold the stable tags of
//! [`fl_core::units`].

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use fl_core::{
    Car, CarId, EventId, EventRange, EventStore, FuelEntry, FuelEvent, Inherited, NewCar,
    ValidationError,
};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse an event timestamp.
    #[error("invalid timestamp for event {event_id}: {timestamp}")]
    TimestampParse {
        event_id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored quantity is not a decimal number.
    #[error("invalid decimal in column {column}: {value}")]
    InvalidDecimal {
        column: &'static str,
        value: String,
        #[source]
        source: rust_decimal::Error,
    },
    /// A stored unit tag or identifier is not valid.
    #[error("invalid stored value: {0}")]
    Validation(#[from] ValidationError),
    #[error("unknown car: {0}")]
    UnknownCar(CarId),
    #[error("unknown fuel event: {0}")]
    UnknownEvent(EventId),
    /// The car already has an event at this instant.
    #[error("car {car} already has an event at {timestamp}")]
    DuplicateTimestamp {
        car: CarId,
        timestamp: DateTime<Utc>,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Row counts shown by `fl status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbStats {
    pub cars: i64,
    pub events: i64,
}

const CAR_COLUMNS: &str = "id, name, number_plate, display_order, odometer_unit, volume_unit, \
     consumption_unit, odometer, distance_total_sum, fuel_volume_total_sum";

const EVENT_COLUMNS: &str = "id, car_id, timestamp, distance, fuel_volume, price, filled_up, \
     inherited_cost, inherited_distance, inherited_fuel_volume, comment";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            -- Cars: display units and aggregate totals
            -- odometer, *_total_sum: decimal TEXT in kilometers / liters
            -- *_unit: unit tags (e.g. 'km', 'gal_uk', 'l_per_100km')
            CREATE TABLE IF NOT EXISTS cars (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                number_plate TEXT NOT NULL DEFAULT '',
                display_order INTEGER NOT NULL DEFAULT 0,
                odometer_unit TEXT NOT NULL,
                volume_unit TEXT NOT NULL,
                consumption_unit TEXT NOT NULL,
                odometer TEXT NOT NULL DEFAULT '0',
                distance_total_sum TEXT NOT NULL DEFAULT '0',
                fuel_volume_total_sum TEXT NOT NULL DEFAULT '0'
            );

            CREATE INDEX IF NOT EXISTS idx_cars_order ON cars(display_order);

            -- Fuel events: one fill-up each
            -- timestamp: RFC 3339 UTC with milliseconds, unique per car
            -- price: per liter; inherited_*: amounts carried from partial fill-ups
            CREATE TABLE IF NOT EXISTS fuel_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                car_id INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                distance TEXT NOT NULL,
                fuel_volume TEXT NOT NULL,
                price TEXT NOT NULL,
                filled_up INTEGER NOT NULL,
                inherited_cost TEXT NOT NULL DEFAULT '0',
                inherited_distance TEXT NOT NULL DEFAULT '0',
                inherited_fuel_volume TEXT NOT NULL DEFAULT '0',
                comment TEXT,
                UNIQUE (car_id, timestamp),
                FOREIGN KEY (car_id) REFERENCES cars(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_fuel_events_car_timestamp ON fuel_events(car_id, timestamp);
            ",
        )?;
        Ok(())
    }

    /// Starts a unit of work.
    ///
    /// Only one working copy can exist at a time since it borrows the
    /// connection mutably.
    pub fn working_copy(&mut self) -> Result<WorkingCopy<'_>, DbError> {
        let tx = self.conn.transaction()?;
        Ok(WorkingCopy { tx })
    }

    /// Lists all cars ordered by display position then ID.
    pub fn list_cars(&self) -> Result<Vec<Car>, DbError> {
        query_cars(&self.conn)
    }

    pub fn car(&self, id: CarId) -> Result<Option<Car>, DbError> {
        query_car(&self.conn, id)
    }

    /// Lists the events of a car, oldest first.
    pub fn list_events(&self, car: CarId) -> Result<Vec<FuelEvent>, DbError> {
        query_events(&self.conn, car, EventRange::All)
    }

    pub fn event(&self, id: EventId) -> Result<Option<FuelEvent>, DbError> {
        query_event(&self.conn, id)
    }

    pub fn stats(&self) -> Result<DbStats, DbError> {
        let cars = self
            .conn
            .query_row("SELECT COUNT(*) FROM cars", [], |row| row.get(0))?;
        let events = self
            .conn
            .query_row("SELECT COUNT(*) FROM fuel_events", [], |row| row.get(0))?;
        Ok(DbStats { cars, events })
    }
}

/// An open transaction implementing [`EventStore`].
///
/// Dropping a working copy without calling [`commit`](Self::commit) rolls
/// back every change made through it.
pub struct WorkingCopy<'conn> {
    tx: Transaction<'conn>,
}

impl WorkingCopy<'_> {
    /// Publishes all changes made through this working copy.
    pub fn commit(self) -> Result<(), DbError> {
        self.tx.commit()?;
        debug!("committed working copy");
        Ok(())
    }
}

impl EventStore for WorkingCopy<'_> {
    type Error = DbError;

    fn cars(&self) -> Result<Vec<Car>, DbError> {
        query_cars(&self.tx)
    }

    fn car(&self, id: CarId) -> Result<Option<Car>, DbError> {
        query_car(&self.tx, id)
    }

    fn create_car(&mut self, car: &NewCar) -> Result<Car, DbError> {
        self.tx.execute(
            "
            INSERT INTO cars
            (name, number_plate, display_order, odometer_unit, volume_unit, consumption_unit,
             odometer, distance_total_sum, fuel_volume_total_sum)
            VALUES (?, ?, ?, ?, ?, ?, ?, '0', '0')
            ",
            params![
                car.name,
                car.number_plate,
                car.order,
                car.odometer_unit.as_str(),
                car.volume_unit.as_str(),
                car.consumption_unit.as_str(),
                car.odometer.to_string(),
            ],
        )?;
        let id = CarId::new(self.tx.last_insert_rowid())?;
        Ok(Car {
            id,
            name: car.name.clone(),
            number_plate: car.number_plate.clone(),
            order: car.order,
            odometer_unit: car.odometer_unit,
            volume_unit: car.volume_unit,
            consumption_unit: car.consumption_unit,
            odometer: car.odometer,
            distance_total_sum: Decimal::ZERO,
            fuel_volume_total_sum: Decimal::ZERO,
        })
    }

    fn update_car(&mut self, car: &Car) -> Result<(), DbError> {
        let updated = self.tx.execute(
            "
            UPDATE cars
            SET name = ?, number_plate = ?, display_order = ?, odometer_unit = ?,
                volume_unit = ?, consumption_unit = ?, odometer = ?,
                distance_total_sum = ?, fuel_volume_total_sum = ?
            WHERE id = ?
            ",
            params![
                car.name,
                car.number_plate,
                car.order,
                car.odometer_unit.as_str(),
                car.volume_unit.as_str(),
                car.consumption_unit.as_str(),
                car.odometer.to_string(),
                car.distance_total_sum.to_string(),
                car.fuel_volume_total_sum.to_string(),
                car.id.get(),
            ],
        )?;
        if updated == 0 {
            return Err(DbError::UnknownCar(car.id));
        }
        Ok(())
    }

    fn events(&self, car: CarId, range: EventRange) -> Result<Vec<FuelEvent>, DbError> {
        query_events(&self.tx, car, range)
    }

    fn event(&self, id: EventId) -> Result<Option<FuelEvent>, DbError> {
        query_event(&self.tx, id)
    }

    fn contains_event(&self, car: CarId, timestamp: DateTime<Utc>) -> Result<bool, DbError> {
        let exists = self.tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM fuel_events WHERE car_id = ? AND timestamp = ?)",
            params![car.get(), format_timestamp(timestamp)],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn create_event(&mut self, entry: &FuelEntry, inherited: Inherited) -> Result<FuelEvent, DbError> {
        if query_car(&self.tx, entry.car_id)?.is_none() {
            return Err(DbError::UnknownCar(entry.car_id));
        }
        if self.contains_event(entry.car_id, entry.timestamp)? {
            return Err(DbError::DuplicateTimestamp {
                car: entry.car_id,
                timestamp: entry.timestamp,
            });
        }

        self.tx.execute(
            "
            INSERT INTO fuel_events
            (car_id, timestamp, distance, fuel_volume, price, filled_up,
             inherited_cost, inherited_distance, inherited_fuel_volume, comment)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                entry.car_id.get(),
                format_timestamp(entry.timestamp),
                entry.distance.to_string(),
                entry.fuel_volume.to_string(),
                entry.price.to_string(),
                entry.filled_up,
                inherited.cost.to_string(),
                inherited.distance.to_string(),
                inherited.fuel_volume.to_string(),
                entry.comment,
            ],
        )?;
        let id = EventId::new(self.tx.last_insert_rowid())?;
        Ok(FuelEvent {
            id,
            car_id: entry.car_id,
            timestamp: entry.timestamp,
            distance: entry.distance,
            fuel_volume: entry.fuel_volume,
            price: entry.price,
            filled_up: entry.filled_up,
            inherited,
            comment: entry.comment.clone(),
        })
    }

    fn update_inherited(&mut self, id: EventId, inherited: Inherited) -> Result<(), DbError> {
        let updated = self.tx.execute(
            "
            UPDATE fuel_events
            SET inherited_cost = ?, inherited_distance = ?, inherited_fuel_volume = ?
            WHERE id = ?
            ",
            params![
                inherited.cost.to_string(),
                inherited.distance.to_string(),
                inherited.fuel_volume.to_string(),
                id.get(),
            ],
        )?;
        if updated == 0 {
            return Err(DbError::UnknownEvent(id));
        }
        Ok(())
    }

    fn delete_event(&mut self, id: EventId) -> Result<(), DbError> {
        let deleted = self
            .tx
            .execute("DELETE FROM fuel_events WHERE id = ?", [id.get()])?;
        if deleted == 0 {
            return Err(DbError::UnknownEvent(id));
        }
        Ok(())
    }

    fn previous_event(
        &self,
        car: CarId,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<FuelEvent>, DbError> {
        let sql = format!(
            "
            SELECT {EVENT_COLUMNS}
            FROM fuel_events
            WHERE car_id = ? AND timestamp < ?
            ORDER BY timestamp DESC
            LIMIT 1
            "
        );
        self.tx
            .query_row(
                &sql,
                params![car.get(), format_timestamp(timestamp)],
                EventRow::read,
            )
            .optional()?
            .map(EventRow::into_event)
            .transpose()
    }
}

/// A car row as stored, before its columns are parsed.
struct CarRow {
    id: i64,
    name: String,
    number_plate: String,
    order: i64,
    odometer_unit: String,
    volume_unit: String,
    consumption_unit: String,
    odometer: String,
    distance_total_sum: String,
    fuel_volume_total_sum: String,
}

impl CarRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            number_plate: row.get(2)?,
            order: row.get(3)?,
            odometer_unit: row.get(4)?,
            volume_unit: row.get(5)?,
            consumption_unit: row.get(6)?,
            odometer: row.get(7)?,
            distance_total_sum: row.get(8)?,
            fuel_volume_total_sum: row.get(9)?,
        })
    }

    fn into_car(self) -> Result<Car, DbError> {
        Ok(Car {
            id: CarId::new(self.id)?,
            name: self.name,
            number_plate: self.number_plate,
            order: self.order,
            odometer_unit: self.odometer_unit.parse()?,
            volume_unit: self.volume_unit.parse()?,
            consumption_unit: self.consumption_unit.parse()?,
            odometer: parse_decimal("odometer", &self.odometer)?,
            distance_total_sum: parse_decimal("distance_total_sum", &self.distance_total_sum)?,
            fuel_volume_total_sum: parse_decimal(
                "fuel_volume_total_sum",
                &self.fuel_volume_total_sum,
            )?,
        })
    }
}

/// A fuel event row as stored, before its columns are parsed.
struct EventRow {
    id: i64,
    car_id: i64,
    timestamp: String,
    distance: String,
    fuel_volume: String,
    price: String,
    filled_up: bool,
    inherited_cost: String,
    inherited_distance: String,
    inherited_fuel_volume: String,
    comment: Option<String>,
}

impl EventRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            car_id: row.get(1)?,
            timestamp: row.get(2)?,
            distance: row.get(3)?,
            fuel_volume: row.get(4)?,
            price: row.get(5)?,
            filled_up: row.get(6)?,
            inherited_cost: row.get(7)?,
            inherited_distance: row.get(8)?,
            inherited_fuel_volume: row.get(9)?,
            comment: row.get(10)?,
        })
    }

    fn into_event(self) -> Result<FuelEvent, DbError> {
        Ok(FuelEvent {
            id: EventId::new(self.id)?,
            car_id: CarId::new(self.car_id)?,
            timestamp: parse_timestamp(&self.timestamp, self.id)?,
            distance: parse_decimal("distance", &self.distance)?,
            fuel_volume: parse_decimal("fuel_volume", &self.fuel_volume)?,
            price: parse_decimal("price", &self.price)?,
            filled_up: self.filled_up,
            inherited: Inherited {
                cost: parse_decimal("inherited_cost", &self.inherited_cost)?,
                distance: parse_decimal("inherited_distance", &self.inherited_distance)?,
                fuel_volume: parse_decimal("inherited_fuel_volume", &self.inherited_fuel_volume)?,
            },
            comment: self.comment,
        })
    }
}

fn query_cars(conn: &Connection) -> Result<Vec<Car>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CAR_COLUMNS} FROM cars ORDER BY display_order ASC, id ASC"
    ))?;
    let rows = stmt.query_map([], CarRow::read)?;
    let mut cars = Vec::new();
    for row in rows {
        cars.push(row?.into_car()?);
    }
    Ok(cars)
}

fn query_car(conn: &Connection, id: CarId) -> Result<Option<Car>, DbError> {
    conn.query_row(
        &format!("SELECT {CAR_COLUMNS} FROM cars WHERE id = ?"),
        [id.get()],
        CarRow::read,
    )
    .optional()?
    .map(CarRow::into_car)
    .transpose()
}

fn query_event(conn: &Connection, id: EventId) -> Result<Option<FuelEvent>, DbError> {
    conn.query_row(
        &format!("SELECT {EVENT_COLUMNS} FROM fuel_events WHERE id = ?"),
        [id.get()],
        EventRow::read,
    )
    .optional()?
    .map(EventRow::into_event)
    .transpose()
}

fn query_events(conn: &Connection, car: CarId, range: EventRange) -> Result<Vec<FuelEvent>, DbError> {
    let (filter, bound) = match range {
        EventRange::All => ("", None),
        EventRange::Before {
            timestamp,
            inclusive,
        } => (
            if inclusive {
                "AND timestamp <= ?2"
            } else {
                "AND timestamp < ?2"
            },
            Some(format_timestamp(timestamp)),
        ),
        EventRange::After {
            timestamp,
            inclusive,
        } => (
            if inclusive {
                "AND timestamp >= ?2"
            } else {
                "AND timestamp > ?2"
            },
            Some(format_timestamp(timestamp)),
        ),
    };
    let mut stmt = conn.prepare(&format!(
        "
        SELECT {EVENT_COLUMNS}
        FROM fuel_events
        WHERE car_id = ?1 {filter}
        ORDER BY timestamp ASC
        "
    ))?;
    let rows = match bound {
        Some(bound) => stmt.query_map(params![car.get(), bound], EventRow::read)?,
        None => stmt.query_map(params![car.get()], EventRow::read)?,
    };
    let mut events = Vec::new();
    for row in rows {
        events.push(row?.into_event()?);
    }
    Ok(events)
}

fn parse_timestamp(timestamp: &str, event_id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            event_id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_decimal(column: &'static str, value: &str) -> Result<Decimal, DbError> {
    Decimal::from_str(value).map_err(|source| DbError::InvalidDecimal {
        column,
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use fl_core::{Importer, Locale, Normalizer, add_event, rebuild, remove_event};
    use rust_decimal_macros::dec;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, day, 12, 0, 0).unwrap()
    }

    fn entry(car: CarId, day: u32, filled_up: bool) -> FuelEntry {
        FuelEntry {
            car_id: car,
            timestamp: at(day),
            distance: dec!(250.5),
            fuel_volume: dec!(18.25),
            price: dec!(1.799),
            filled_up,
            comment: None,
        }
    }

    fn create_car(db: &mut Database) -> CarId {
        let mut work = db.working_copy().unwrap();
        let car = work
            .create_car(&NewCar::for_region("Polo", "B-XY 99", Some("DE")))
            .unwrap();
        work.commit().unwrap();
        car.id
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.stats().unwrap(), DbStats { cars: 0, events: 0 });
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(
            table_columns(&db.conn, "cars"),
            vec![
                "id",
                "name",
                "number_plate",
                "display_order",
                "odometer_unit",
                "volume_unit",
                "consumption_unit",
                "odometer",
                "distance_total_sum",
                "fuel_volume_total_sum",
            ]
        );
        assert_eq!(
            table_columns(&db.conn, "fuel_events"),
            vec![
                "id",
                "car_id",
                "timestamp",
                "distance",
                "fuel_volume",
                "price",
                "filled_up",
                "inherited_cost",
                "inherited_distance",
                "inherited_fuel_volume",
                "comment",
            ]
        );
    }

    #[test]
    fn init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fl.db");
        let mut db = Database::open(&path).unwrap();
        let car = create_car(&mut db);
        drop(db);

        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_cars().unwrap()[0].id, car);
    }

    #[test]
    fn car_round_trips_through_storage() {
        let mut db = Database::open_in_memory().unwrap();
        let id = create_car(&mut db);

        let mut car = db.car(id).unwrap().unwrap();
        assert_eq!(car.name, "Polo");
        assert_eq!(car.odometer, Decimal::ZERO);

        car.odometer = dec!(12345.678);
        car.order = 3;
        let mut work = db.working_copy().unwrap();
        work.update_car(&car).unwrap();
        work.commit().unwrap();

        assert_eq!(db.car(id).unwrap().unwrap(), car);
    }

    #[test]
    fn event_round_trips_through_storage() {
        let mut db = Database::open_in_memory().unwrap();
        let car = create_car(&mut db);

        let mut work = db.working_copy().unwrap();
        let mut with_comment = entry(car, 2, false);
        with_comment.comment = Some("Autobahn".to_string());
        let inherited = Inherited {
            cost: dec!(32.83),
            distance: dec!(250.5),
            fuel_volume: dec!(18.25),
        };
        let created = work.create_event(&with_comment, inherited).unwrap();
        work.commit().unwrap();

        assert_eq!(db.event(created.id).unwrap(), Some(created));
    }

    #[test]
    fn events_are_ordered_and_filtered_by_range() {
        let mut db = Database::open_in_memory().unwrap();
        let car = create_car(&mut db);

        let mut work = db.working_copy().unwrap();
        for day in [9, 3, 6] {
            work.create_event(&entry(car, day, true), Inherited::ZERO)
                .unwrap();
        }

        let all: Vec<DateTime<Utc>> = work
            .events(car, EventRange::All)
            .unwrap()
            .into_iter()
            .map(|event| event.timestamp)
            .collect();
        assert_eq!(all, vec![at(3), at(6), at(9)]);

        let before = work
            .events(
                car,
                EventRange::Before {
                    timestamp: at(6),
                    inclusive: true,
                },
            )
            .unwrap();
        assert_eq!(before.len(), 2);

        let after = work
            .events(
                car,
                EventRange::After {
                    timestamp: at(6),
                    inclusive: false,
                },
            )
            .unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].timestamp, at(9));

        let previous = work.previous_event(car, at(9)).unwrap().unwrap();
        assert_eq!(previous.timestamp, at(6));
        assert!(work.previous_event(car, at(3)).unwrap().is_none());
    }

    #[test]
    fn duplicate_timestamp_is_rejected() {
        let mut db = Database::open_in_memory().unwrap();
        let car = create_car(&mut db);

        let mut work = db.working_copy().unwrap();
        work.create_event(&entry(car, 1, true), Inherited::ZERO)
            .unwrap();
        assert!(work.contains_event(car, at(1)).unwrap());
        let err = work
            .create_event(&entry(car, 1, true), Inherited::ZERO)
            .unwrap_err();
        assert!(matches!(err, DbError::DuplicateTimestamp { .. }));
    }

    #[test]
    fn unknown_rows_are_reported() {
        let mut db = Database::open_in_memory().unwrap();
        let mut work = db.working_copy().unwrap();
        let missing_car = CarId::new(42).unwrap();
        let missing_event = EventId::new(42).unwrap();

        let err = work
            .create_event(&entry(missing_car, 1, true), Inherited::ZERO)
            .unwrap_err();
        assert!(matches!(err, DbError::UnknownCar(id) if id == missing_car));
        assert!(matches!(
            work.delete_event(missing_event),
            Err(DbError::UnknownEvent(_))
        ));
        assert!(matches!(
            work.update_inherited(missing_event, Inherited::ZERO),
            Err(DbError::UnknownEvent(_))
        ));
    }

    #[test]
    fn dropped_working_copy_rolls_back() {
        let mut db = Database::open_in_memory().unwrap();
        {
            let mut work = db.working_copy().unwrap();
            work.create_car(&NewCar::for_region("Discarded", "", None))
                .unwrap();
        }
        assert!(db.list_cars().unwrap().is_empty());
    }

    #[test]
    fn ledger_runs_against_working_copy() {
        let mut db = Database::open_in_memory().unwrap();
        let car = create_car(&mut db);

        let mut work = db.working_copy().unwrap();
        add_event(&mut work, &entry(car, 5, true)).unwrap();
        add_event(&mut work, &entry(car, 1, false)).unwrap();
        let middle = add_event(&mut work, &entry(car, 3, false)).unwrap();
        add_event(&mut work, &entry(car, 7, true)).unwrap();
        remove_event(&mut work, middle.id).unwrap();
        work.commit().unwrap();

        let stored = db.list_events(car).unwrap();
        let mut expected = stored.clone();
        rebuild(&mut expected);
        assert_eq!(stored, expected);
        assert_eq!(stored[1].inherited.distance, dec!(250.5));

        let car = db.car(car).unwrap().unwrap();
        assert_eq!(car.distance_total_sum, dec!(751.5));
        assert!(car.odometer >= car.distance_total_sum);
    }

    #[test]
    fn import_commits_as_one_unit() {
        let csv = "\
yyyy-MM-dd;HH:mm;Kilometers;Liters;Full Fill-Up;Price per Liter;Comment
2024-01-05;08:15;\"512,3\";\"38,20\";Yes;\"1,799\";
2024-01-19;17:40;\"430,0\";\"30,10\";Yes;\"1,759\";Urlaub
";
        let importer = Importer::new(Normalizer::new(Locale::from_tag("de_DE")));
        let mut db = Database::open_in_memory().unwrap();

        let mut work = db.working_copy().unwrap();
        let summary = importer.import(&mut work, csv, "Golf__HH-AB12.csv").unwrap();
        work.commit().unwrap();

        assert_eq!(summary.cars, 1);
        assert_eq!(summary.events, 2);
        let cars = db.list_cars().unwrap();
        assert_eq!(cars[0].name, "Golf");
        assert_eq!(cars[0].number_plate, "HH-AB12");
        let events = db.list_events(cars[0].id).unwrap();
        assert_eq!(events[1].comment.as_deref(), Some("Urlaub"));
        assert_eq!(db.stats().unwrap(), DbStats { cars: 1, events: 2 });
    }
}
