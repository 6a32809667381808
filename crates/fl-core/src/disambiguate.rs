//! Correcting trip distances that were exported without their decimal shift.

use rust_decimal::Decimal;
use tracing::debug;

use crate::units::{ConsumptionUnit, consumption};

/// Factor applied to a suspicious trip distance.
pub const DISTANCE_CORRECTION_FACTOR: Decimal = Decimal::from_parts(8, 0, 0, false, 0);

/// Lowest plausible consumption in liters per 100 km.
pub const PLAUSIBLE_CONSUMPTION_MIN: Decimal = Decimal::from_parts(2, 0, 0, false, 0);

/// Highest plausible consumption in liters per 100 km.
pub const PLAUSIBLE_CONSUMPTION_MAX: Decimal = Decimal::from_parts(20, 0, 0, false, 0);

/// Returns the trip distance that was most likely driven.
///
/// `kilometers` is used as read unless it implies a consumption of at least
/// 20 l/100km while eight times the distance lands inside the 2..=20 band.
pub fn guess_distance(kilometers: Decimal, liters: Decimal) -> Decimal {
    if liters <= Decimal::ZERO {
        return kilometers;
    }

    let corrected = kilometers.saturating_mul(DISTANCE_CORRECTION_FACTOR);
    let unit = ConsumptionUnit::LitersPer100Km;
    let (Some(raw), Some(converted)) = (
        consumption(kilometers, liters, unit),
        consumption(corrected, liters, unit),
    ) else {
        return kilometers;
    };

    if raw < PLAUSIBLE_CONSUMPTION_MAX {
        return kilometers;
    }
    if !(PLAUSIBLE_CONSUMPTION_MIN..=PLAUSIBLE_CONSUMPTION_MAX).contains(&converted) {
        return kilometers;
    }

    debug!(%kilometers, %corrected, %liters, "correcting implausible trip distance");
    corrected
}

#[cfg(test)]
mod tests {
    use super::*;

    use rust_decimal_macros::dec;

    #[test]
    fn plausible_distance_is_kept() {
        assert_eq!(guess_distance(dec!(100), dec!(5)), dec!(100));
    }

    #[test]
    fn implausible_distance_is_multiplied() {
        assert_eq!(guess_distance(dec!(10), dec!(5)), dec!(80));
    }

    #[test]
    fn correction_must_land_in_band() {
        // 1 km on 5 l is 500 l/100km, 8 km still 62.5 l/100km.
        assert_eq!(guess_distance(dec!(1), dec!(5)), dec!(1));
        // 25 l/100km raw, 3.13 after correction.
        assert_eq!(guess_distance(dec!(20), dec!(5)), dec!(160));
    }

    #[test]
    fn no_fuel_or_distance_keeps_value() {
        assert_eq!(guess_distance(dec!(10), dec!(0)), dec!(10));
        assert_eq!(guess_distance(dec!(0), dec!(5)), dec!(0));
        assert_eq!(guess_distance(dec!(-4), dec!(5)), dec!(-4));
    }
}
