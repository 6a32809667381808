//! Cars and fuel events.
//!
//! All quantities are canonical: kilometers, liters and price per liter.
//! The units stored on a [`Car`] only control how values are shown and
//! entered.

use std::ops::{Add, AddAssign, Neg};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CarId, EventId};
use crate::units::{ConsumptionUnit, DistanceUnit, VolumeUnit, consumption};

/// Cost, distance and fuel volume of one or more events.
///
/// Used both for an event's own amounts and for the amounts it inherits
/// from the partial fill-ups before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Inherited {
    pub cost: Decimal,
    pub distance: Decimal,
    pub fuel_volume: Decimal,
}

impl Inherited {
    pub const ZERO: Self = Self {
        cost: Decimal::ZERO,
        distance: Decimal::ZERO,
        fuel_volume: Decimal::ZERO,
    };

    pub fn is_zero(&self) -> bool {
        self.cost.is_zero() && self.distance.is_zero() && self.fuel_volume.is_zero()
    }

    /// Whether any component is positive.
    pub fn is_positive(&self) -> bool {
        self.cost > Decimal::ZERO
            || self.distance > Decimal::ZERO
            || self.fuel_volume > Decimal::ZERO
    }

    /// Adds `delta` and clamps every component at zero.
    #[must_use]
    pub fn shifted(self, delta: Self) -> Self {
        let clamp = |value: Decimal| value.max(Decimal::ZERO);
        let sum = self + delta;
        Self {
            cost: clamp(sum.cost),
            distance: clamp(sum.distance),
            fuel_volume: clamp(sum.fuel_volume),
        }
    }

    /// Component-wise sum, or `None` if any component overflows.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        Some(Self {
            cost: self.cost.checked_add(rhs.cost)?,
            distance: self.distance.checked_add(rhs.distance)?,
            fuel_volume: self.fuel_volume.checked_add(rhs.fuel_volume)?,
        })
    }
}

/// Saturates at the bounds of [`Decimal`].
impl Add for Inherited {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            cost: self.cost.saturating_add(rhs.cost),
            distance: self.distance.saturating_add(rhs.distance),
            fuel_volume: self.fuel_volume.saturating_add(rhs.fuel_volume),
        }
    }
}

impl AddAssign for Inherited {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Neg for Inherited {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            cost: -self.cost,
            distance: -self.distance,
            fuel_volume: -self.fuel_volume,
        }
    }
}

/// A car with its display units and aggregate totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    pub id: CarId,
    pub name: String,
    pub number_plate: String,
    /// Display position; lower values list first.
    pub order: i64,
    pub odometer_unit: DistanceUnit,
    pub volume_unit: VolumeUnit,
    pub consumption_unit: ConsumptionUnit,
    /// Absolute odometer reading in kilometers.
    pub odometer: Decimal,
    pub distance_total_sum: Decimal,
    pub fuel_volume_total_sum: Decimal,
}

/// Values for a car that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCar {
    pub name: String,
    pub number_plate: String,
    pub order: i64,
    pub odometer_unit: DistanceUnit,
    pub volume_unit: VolumeUnit,
    pub consumption_unit: ConsumptionUnit,
    pub odometer: Decimal,
}

impl NewCar {
    /// A car with the default units of `region` and a zero odometer.
    pub fn for_region(name: impl Into<String>, number_plate: impl Into<String>, region: Option<&str>) -> Self {
        Self {
            name: name.into(),
            number_plate: number_plate.into(),
            order: 0,
            odometer_unit: DistanceUnit::for_region(region),
            volume_unit: VolumeUnit::for_region(region),
            consumption_unit: ConsumptionUnit::for_region(region),
            odometer: Decimal::ZERO,
        }
    }
}

/// User-supplied values of a fuel event, in canonical units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelEntry {
    pub car_id: CarId,
    pub timestamp: DateTime<Utc>,
    pub distance: Decimal,
    pub fuel_volume: Decimal,
    /// Price per liter.
    pub price: Decimal,
    pub filled_up: bool,
    pub comment: Option<String>,
}

impl FuelEntry {
    /// Volume times price, saturating at the bounds of [`Decimal`].
    pub fn cost(&self) -> Decimal {
        self.fuel_volume.saturating_mul(self.price)
    }

    /// The entry's own cost, distance and volume.
    pub fn amounts(&self) -> Inherited {
        Inherited {
            cost: self.cost(),
            distance: self.distance,
            fuel_volume: self.fuel_volume,
        }
    }

    /// Like [`Self::amounts`], or `None` if the cost does not fit a
    /// [`Decimal`].
    pub fn checked_amounts(&self) -> Option<Inherited> {
        Some(Inherited {
            cost: self.fuel_volume.checked_mul(self.price)?,
            distance: self.distance,
            fuel_volume: self.fuel_volume,
        })
    }
}

/// A stored fuel event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelEvent {
    pub id: EventId,
    pub car_id: CarId,
    pub timestamp: DateTime<Utc>,
    pub distance: Decimal,
    pub fuel_volume: Decimal,
    pub price: Decimal,
    pub filled_up: bool,
    pub inherited: Inherited,
    pub comment: Option<String>,
}

impl FuelEvent {
    pub fn cost(&self) -> Decimal {
        self.fuel_volume.saturating_mul(self.price)
    }

    pub fn amounts(&self) -> Inherited {
        Inherited {
            cost: self.cost(),
            distance: self.distance,
            fuel_volume: self.fuel_volume,
        }
    }

    /// Consumption measured at this event.
    ///
    /// Only full fill-ups yield a value; the distance and volume of the
    /// partial fill-ups before it are included.
    pub fn consumption(&self, unit: ConsumptionUnit) -> Option<Decimal> {
        if !self.filled_up {
            return None;
        }
        consumption(
            self.distance.checked_add(self.inherited.distance)?,
            self.fuel_volume.checked_add(self.inherited.fuel_volume)?,
            unit,
        )
    }

    pub fn checked_amounts(&self) -> Option<Inherited> {
        Some(Inherited {
            cost: self.fuel_volume.checked_mul(self.price)?,
            distance: self.distance,
            fuel_volume: self.fuel_volume,
        })
    }

    /// The entry values of this event, e.g. to re-insert it elsewhere.
    pub fn to_entry(&self) -> FuelEntry {
        FuelEntry {
            car_id: self.car_id,
            timestamp: self.timestamp,
            distance: self.distance,
            fuel_volume: self.fuel_volume,
            price: self.price,
            filled_up: self.filled_up,
            comment: self.comment.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn event(filled_up: bool, inherited: Inherited) -> FuelEvent {
        FuelEvent {
            id: EventId::new(1).unwrap(),
            car_id: CarId::new(1).unwrap(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            distance: dec!(300),
            fuel_volume: dec!(20),
            price: dec!(1.75),
            filled_up,
            inherited,
            comment: None,
        }
    }

    #[test]
    fn cost_is_volume_times_price() {
        assert_eq!(event(true, Inherited::ZERO).cost(), dec!(35));
    }

    #[test]
    fn consumption_includes_inherited_amounts() {
        let inherited = Inherited {
            cost: dec!(17.5),
            distance: dec!(100),
            fuel_volume: dec!(10),
        };
        let value = event(true, inherited).consumption(ConsumptionUnit::LitersPer100Km);
        assert_eq!(value, Some(dec!(7.5)));
    }

    #[test]
    fn partial_fill_up_has_no_consumption() {
        let value = event(false, Inherited::ZERO).consumption(ConsumptionUnit::LitersPer100Km);
        assert_eq!(value, None);
    }

    #[test]
    fn shifted_clamps_at_zero() {
        let inherited = Inherited {
            cost: dec!(5),
            distance: dec!(50),
            fuel_volume: dec!(3),
        };
        let delta = Inherited {
            cost: dec!(-10),
            distance: dec!(-20),
            fuel_volume: dec!(1),
        };
        assert_eq!(
            inherited.shifted(delta),
            Inherited {
                cost: dec!(0),
                distance: dec!(30),
                fuel_volume: dec!(4),
            }
        );
    }

    #[test]
    fn oversized_amounts_are_not_computed() {
        let mut huge = event(false, Inherited::ZERO);
        huge.fuel_volume = dec!(100000000000000000000);
        huge.price = dec!(10000000000);
        assert_eq!(huge.checked_amounts(), None);
        assert_eq!(huge.cost(), Decimal::MAX);

        let full = Inherited {
            cost: Decimal::MAX,
            distance: dec!(1),
            fuel_volume: dec!(1),
        };
        assert_eq!(full.checked_add(full), None);
        assert_eq!((full + full).cost, Decimal::MAX);
        assert_eq!(
            event(true, Inherited::ZERO).checked_amounts(),
            Some(Inherited {
                cost: dec!(35),
                distance: dec!(300),
                fuel_volume: dec!(20),
            })
        );
    }
}
