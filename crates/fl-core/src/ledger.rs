//! The fill-up ledger.
//!
//! A partial fill-up does not tell how much fuel the distance since the
//! last full tank took, so its cost, distance and volume are carried
//! forward as *inherited* amounts until the next full fill-up. For every run
//! of consecutive partial fill-ups of a car, each event inherits the sum of
//! the run before it, and the full fill-up that ends the run inherits the
//! sum of the whole run. The next run starts again at zero.
//!
//! [`LedgerRun`] computes these values for a chronological stream and is
//! what bulk imports and [`recompute_car`] use. [`add_event`] and
//! [`remove_event`] update only the events between the change and the next
//! full fill-up, and leave the store in the same state a rebuild would.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::model::{Car, FuelEntry, FuelEvent, Inherited};
use crate::store::{EventRange, EventStore};
use crate::types::{CarId, EventId};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("unknown car: {0}")]
    UnknownCar(CarId),

    #[error("unknown fuel event: {0}")]
    UnknownEvent(EventId),

    #[error("car {car} already has a fuel event at {timestamp}")]
    DuplicateTimestamp {
        car: CarId,
        timestamp: DateTime<Utc>,
    },

    #[error("amounts of the fuel event at {timestamp} are too large")]
    Overflow { timestamp: DateTime<Utc> },

    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(err))
    }
}

/// Running inherited amounts over a chronological stream of one car's
/// events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerRun {
    carried: Inherited,
}

impl LedgerRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amounts the next event will inherit.
    pub const fn carried(&self) -> Inherited {
        self.carried
    }

    /// Returns the inherited amounts for an event with the given fill-up
    /// flag and own amounts, then moves past it.
    pub fn advance(&mut self, filled_up: bool, amounts: Inherited) -> Inherited {
        let inherited = self.carried;
        if filled_up {
            self.carried = Inherited::ZERO;
        } else {
            self.carried += amounts;
        }
        inherited
    }

    /// Like [`Self::advance`], but leaves the run untouched and returns
    /// `None` if the carried amounts would overflow.
    pub fn try_advance(&mut self, filled_up: bool, amounts: Inherited) -> Option<Inherited> {
        let inherited = self.carried;
        self.carried = if filled_up {
            Inherited::ZERO
        } else {
            self.carried.checked_add(amounts)?
        };
        Some(inherited)
    }
}

/// Recomputes the inherited amounts of chronologically ordered events.
pub fn rebuild(events: &mut [FuelEvent]) {
    let mut run = LedgerRun::new();
    for event in events {
        event.inherited = run.advance(event.filled_up, event.amounts());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OdometerUpdate {
    /// Only when the event is the youngest or the odometer tracks the sum.
    IfTracking,
    Force,
}

/// Inserts a new fuel event and updates the ledger around it.
///
/// Fails with [`LedgerError::DuplicateTimestamp`] before anything is
/// written if the car already has an event at the entry's timestamp.
pub fn add_event<S: EventStore>(store: &mut S, entry: &FuelEntry) -> Result<FuelEvent, LedgerError> {
    insert(store, entry, OdometerUpdate::IfTracking)
}

/// Deletes a fuel event and hands its amounts on to the events after it.
pub fn remove_event<S: EventStore>(store: &mut S, id: EventId) -> Result<FuelEvent, LedgerError> {
    delete(store, id, OdometerUpdate::IfTracking)
}

/// Replaces an event with new values, possibly for another car or time.
///
/// The edit is a removal followed by an insertion, both with a forced
/// odometer update.
pub fn replace_event<S: EventStore>(
    store: &mut S,
    id: EventId,
    entry: &FuelEntry,
) -> Result<FuelEvent, LedgerError> {
    let existing = store
        .event(id)
        .map_err(LedgerError::store)?
        .ok_or(LedgerError::UnknownEvent(id))?;
    if store.car(entry.car_id).map_err(LedgerError::store)?.is_none() {
        return Err(LedgerError::UnknownCar(entry.car_id));
    }

    let same_slot = existing.car_id == entry.car_id && existing.timestamp == entry.timestamp;
    if !same_slot
        && store
            .contains_event(entry.car_id, entry.timestamp)
            .map_err(LedgerError::store)?
    {
        return Err(LedgerError::DuplicateTimestamp {
            car: entry.car_id,
            timestamp: entry.timestamp,
        });
    }

    delete(store, id, OdometerUpdate::Force)?;
    insert(store, entry, OdometerUpdate::Force)
}

/// Re-derives all inherited amounts and totals of a car from its events.
///
/// The odometer is raised to the distance total if it fell behind.
pub fn recompute_car<S: EventStore>(store: &mut S, car_id: CarId) -> Result<Car, LedgerError> {
    let mut car = load_car(store, car_id)?;
    let stored = store
        .events(car_id, EventRange::All)
        .map_err(LedgerError::store)?;

    let mut events = stored.clone();
    rebuild(&mut events);

    let mut changed = 0_usize;
    for (before, after) in stored.iter().zip(&events) {
        if before.inherited != after.inherited {
            store
                .update_inherited(after.id, after.inherited)
                .map_err(LedgerError::store)?;
            changed += 1;
        }
    }

    car.distance_total_sum = events.iter().map(|event| event.distance).sum();
    car.fuel_volume_total_sum = events.iter().map(|event| event.fuel_volume).sum();
    car.odometer = car.odometer.max(car.distance_total_sum);
    store.update_car(&car).map_err(LedgerError::store)?;

    debug!(car = %car_id, events = events.len(), changed, "recomputed ledger");
    Ok(car)
}

fn insert<S: EventStore>(
    store: &mut S,
    entry: &FuelEntry,
    update: OdometerUpdate,
) -> Result<FuelEvent, LedgerError> {
    let mut car = load_car(store, entry.car_id)?;
    let overflow = || LedgerError::Overflow {
        timestamp: entry.timestamp,
    };
    let amounts = entry.checked_amounts().ok_or_else(overflow)?;
    let distance_total_sum = car
        .distance_total_sum
        .checked_add(entry.distance)
        .ok_or_else(overflow)?;
    let fuel_volume_total_sum = car
        .fuel_volume_total_sum
        .checked_add(entry.fuel_volume)
        .ok_or_else(overflow)?;
    if store
        .contains_event(car.id, entry.timestamp)
        .map_err(LedgerError::store)?
    {
        return Err(LedgerError::DuplicateTimestamp {
            car: car.id,
            timestamp: entry.timestamp,
        });
    }

    let inherited = match store
        .previous_event(car.id, entry.timestamp)
        .map_err(LedgerError::store)?
    {
        Some(older) if !older.filled_up => older
            .checked_amounts()
            .and_then(|own| own.checked_add(older.inherited))
            .ok_or_else(overflow)?,
        _ => Inherited::ZERO,
    };

    let younger = store
        .events(
            car.id,
            EventRange::After {
                timestamp: entry.timestamp,
                inclusive: false,
            },
        )
        .map_err(LedgerError::store)?;

    // A full fill-up cuts the run: what it inherits no longer reaches the
    // events after it. A partial one adds its own amounts to them.
    let mut force_odometer = update == OdometerUpdate::Force || younger.is_empty();
    let delta = if entry.filled_up {
        -inherited
    } else {
        amounts
    };
    let touched = propagate(store, &younger, delta)?;

    let event = store
        .create_event(entry, inherited)
        .map_err(LedgerError::store)?;

    force_odometer |= car.odometer <= car.distance_total_sum;
    car.distance_total_sum = distance_total_sum;
    car.fuel_volume_total_sum = fuel_volume_total_sum;
    if force_odometer {
        car.odometer = car
            .odometer
            .saturating_add(entry.distance)
            .max(car.distance_total_sum);
    }
    car.odometer = car.odometer.max(car.distance_total_sum);
    store.update_car(&car).map_err(LedgerError::store)?;

    debug!(
        car = %car.id,
        event = %event.id,
        filled_up = entry.filled_up,
        touched,
        odometer = %car.odometer,
        "added fuel event"
    );
    Ok(event)
}

fn delete<S: EventStore>(
    store: &mut S,
    id: EventId,
    update: OdometerUpdate,
) -> Result<FuelEvent, LedgerError> {
    let event = store
        .event(id)
        .map_err(LedgerError::store)?
        .ok_or(LedgerError::UnknownEvent(id))?;
    let mut car = load_car(store, event.car_id)?;

    let younger = store
        .events(
            car.id,
            EventRange::After {
                timestamp: event.timestamp,
                inclusive: false,
            },
        )
        .map_err(LedgerError::store)?;

    let mut force_odometer = update == OdometerUpdate::Force || younger.is_empty();
    let touched = if event.filled_up {
        if event.inherited.is_positive() {
            propagate(store, &younger, event.inherited)?
        } else {
            0
        }
    } else {
        propagate(store, &younger, -event.amounts())?
    };

    force_odometer |= car.odometer <= car.distance_total_sum;
    car.distance_total_sum = (car.distance_total_sum - event.distance).max(Decimal::ZERO);
    car.fuel_volume_total_sum = (car.fuel_volume_total_sum - event.fuel_volume).max(Decimal::ZERO);
    if force_odometer {
        car.odometer = (car.odometer - event.distance).max(Decimal::ZERO);
    }
    store.update_car(&car).map_err(LedgerError::store)?;
    store.delete_event(id).map_err(LedgerError::store)?;

    debug!(
        car = %car.id,
        event = %id,
        filled_up = event.filled_up,
        touched,
        odometer = %car.odometer,
        "removed fuel event"
    );
    Ok(event)
}

/// Shifts the inherited amounts of `younger` (oldest first) by `delta`, up
/// to and including the first full fill-up. Returns the number of events
/// written.
fn propagate<S: EventStore>(
    store: &mut S,
    younger: &[FuelEvent],
    delta: Inherited,
) -> Result<usize, LedgerError> {
    if delta.is_zero() {
        return Ok(0);
    }

    let mut touched = 0;
    for event in younger {
        store
            .update_inherited(event.id, event.inherited.shifted(delta))
            .map_err(LedgerError::store)?;
        touched += 1;
        if event.filled_up {
            break;
        }
    }
    Ok(touched)
}

fn load_car<S: EventStore>(store: &S, id: CarId) -> Result<Car, LedgerError> {
    store
        .car(id)
        .map_err(LedgerError::store)?
        .ok_or(LedgerError::UnknownCar(id))
}
