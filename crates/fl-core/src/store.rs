//! The storage boundary used by the ledger and the importer.
//!
//! [`EventStore`] is the only way core code touches persisted cars and
//! events. [`MemoryStore`] keeps everything in an arena with a sorted
//! `(car, timestamp)` index and is used in tests and dry runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::model::{Car, FuelEntry, FuelEvent, Inherited, NewCar};
use crate::types::{CarId, EventId};

/// Which of a car's events to fetch, relative to a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRange {
    All,
    Before {
        timestamp: DateTime<Utc>,
        inclusive: bool,
    },
    After {
        timestamp: DateTime<Utc>,
        inclusive: bool,
    },
}

impl EventRange {
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        match *self {
            Self::All => true,
            Self::Before {
                timestamp: bound,
                inclusive,
            } => timestamp < bound || (inclusive && timestamp == bound),
            Self::After {
                timestamp: bound,
                inclusive,
            } => timestamp > bound || (inclusive && timestamp == bound),
        }
    }
}

/// Persistence operations needed by the ledger and the importer.
///
/// Event lists are always ordered oldest first.
pub trait EventStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// All cars, ordered by display position.
    fn cars(&self) -> Result<Vec<Car>, Self::Error>;

    fn car(&self, id: CarId) -> Result<Option<Car>, Self::Error>;

    fn create_car(&mut self, car: &NewCar) -> Result<Car, Self::Error>;

    /// Writes every field of `car` except its ID.
    fn update_car(&mut self, car: &Car) -> Result<(), Self::Error>;

    fn events(&self, car: CarId, range: EventRange) -> Result<Vec<FuelEvent>, Self::Error>;

    fn event(&self, id: EventId) -> Result<Option<FuelEvent>, Self::Error>;

    /// Whether `car` has an event at exactly `timestamp`.
    fn contains_event(&self, car: CarId, timestamp: DateTime<Utc>) -> Result<bool, Self::Error>;

    fn create_event(
        &mut self,
        entry: &FuelEntry,
        inherited: Inherited,
    ) -> Result<FuelEvent, Self::Error>;

    fn update_inherited(&mut self, id: EventId, inherited: Inherited) -> Result<(), Self::Error>;

    fn delete_event(&mut self, id: EventId) -> Result<(), Self::Error>;

    /// The latest event of `car` strictly before `timestamp`.
    fn previous_event(
        &self,
        car: CarId,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<FuelEvent>, Self::Error> {
        let mut events = self.events(
            car,
            EventRange::Before {
                timestamp,
                inclusive: false,
            },
        )?;
        Ok(events.pop())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryStoreError {
    #[error("unknown car: {0}")]
    UnknownCar(CarId),

    #[error("unknown fuel event: {0}")]
    UnknownEvent(EventId),

    #[error("car {car} already has an event at {timestamp}")]
    DuplicateTimestamp {
        car: CarId,
        timestamp: DateTime<Utc>,
    },

    #[error("no identifiers left")]
    IdsExhausted,
}

/// An in-memory [`EventStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    cars: Vec<Car>,
    events: Vec<Option<FuelEvent>>,
    index: BTreeMap<(CarId, DateTime<Utc>), EventId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: EventId) -> Option<&FuelEvent> {
        let index = usize::try_from(id.get() - 1).ok()?;
        self.events.get(index)?.as_ref()
    }

    fn slot_mut(&mut self, id: EventId) -> Option<&mut FuelEvent> {
        let index = usize::try_from(id.get() - 1).ok()?;
        self.events.get_mut(index)?.as_mut()
    }

    fn next_raw_id(len: usize) -> Result<i64, MemoryStoreError> {
        i64::try_from(len)
            .ok()
            .and_then(|len| len.checked_add(1))
            .ok_or(MemoryStoreError::IdsExhausted)
    }
}

impl EventStore for MemoryStore {
    type Error = MemoryStoreError;

    fn cars(&self) -> Result<Vec<Car>, Self::Error> {
        let mut cars = self.cars.clone();
        cars.sort_by_key(|car| (car.order, car.id));
        Ok(cars)
    }

    fn car(&self, id: CarId) -> Result<Option<Car>, Self::Error> {
        Ok(self.cars.iter().find(|car| car.id == id).cloned())
    }

    fn create_car(&mut self, car: &NewCar) -> Result<Car, Self::Error> {
        let id = CarId::new(Self::next_raw_id(self.cars.len())?)
            .map_err(|_| MemoryStoreError::IdsExhausted)?;
        let car = Car {
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
        };
        self.cars.push(car.clone());
        Ok(car)
    }

    fn update_car(&mut self, car: &Car) -> Result<(), Self::Error> {
        let slot = self
            .cars
            .iter_mut()
            .find(|existing| existing.id == car.id)
            .ok_or(MemoryStoreError::UnknownCar(car.id))?;
        *slot = car.clone();
        Ok(())
    }

    fn events(&self, car: CarId, range: EventRange) -> Result<Vec<FuelEvent>, Self::Error> {
        let events = self
            .index
            .range((car, DateTime::<Utc>::MIN_UTC)..=(car, DateTime::<Utc>::MAX_UTC))
            .filter(|((_, timestamp), _)| range.contains(*timestamp))
            .filter_map(|(_, id)| self.slot(*id).cloned())
            .collect();
        Ok(events)
    }

    fn event(&self, id: EventId) -> Result<Option<FuelEvent>, Self::Error> {
        Ok(self.slot(id).cloned())
    }

    fn contains_event(&self, car: CarId, timestamp: DateTime<Utc>) -> Result<bool, Self::Error> {
        Ok(self.index.contains_key(&(car, timestamp)))
    }

    fn create_event(
        &mut self,
        entry: &FuelEntry,
        inherited: Inherited,
    ) -> Result<FuelEvent, Self::Error> {
        if self.car(entry.car_id)?.is_none() {
            return Err(MemoryStoreError::UnknownCar(entry.car_id));
        }
        let key = (entry.car_id, entry.timestamp);
        if self.index.contains_key(&key) {
            return Err(MemoryStoreError::DuplicateTimestamp {
                car: entry.car_id,
                timestamp: entry.timestamp,
            });
        }

        let id = EventId::new(Self::next_raw_id(self.events.len())?)
            .map_err(|_| MemoryStoreError::IdsExhausted)?;
        let event = FuelEvent {
            id,
            car_id: entry.car_id,
            timestamp: entry.timestamp,
            distance: entry.distance,
            fuel_volume: entry.fuel_volume,
            price: entry.price,
            filled_up: entry.filled_up,
            inherited,
            comment: entry.comment.clone(),
        };
        self.index.insert(key, event.id);
        self.events.push(Some(event.clone()));
        Ok(event)
    }

    fn update_inherited(&mut self, id: EventId, inherited: Inherited) -> Result<(), Self::Error> {
        let event = self
            .slot_mut(id)
            .ok_or(MemoryStoreError::UnknownEvent(id))?;
        event.inherited = inherited;
        Ok(())
    }

    fn delete_event(&mut self, id: EventId) -> Result<(), Self::Error> {
        let index = usize::try_from(id.get() - 1).map_err(|_| MemoryStoreError::UnknownEvent(id))?;
        let event = self
            .events
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(MemoryStoreError::UnknownEvent(id))?;
        self.index.remove(&(event.car_id, event.timestamp));
        Ok(())
    }
}
