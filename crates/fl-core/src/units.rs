//! Distance, volume and consumption units.
//!
//! Every quantity is stored in canonical units (kilometers, liters,
//! price per liter). The conversion factors are exact decimal constants so
//! that totals never pick up binary floating point drift.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::ValidationError;

/// Kilometers per statute mile.
pub const KILOMETERS_PER_STATUTE_MILE: Decimal = Decimal::from_parts(1_609_344, 0, 0, false, 6);

/// Liters per US gallon.
pub const LITERS_PER_US_GALLON: Decimal = Decimal::from_parts(3_785_411_784, 0, 0, false, 9);

/// Liters per imperial (UK) gallon.
pub const LITERS_PER_IMPERIAL_GALLON: Decimal = Decimal::from_parts(454_609, 0, 0, false, 5);

const KM_PER_LITER_TO_MPG_US: Decimal = Decimal::from_parts(2_352_145_833, 0, 0, false, 9);
const KM_PER_LITER_TO_MPG_UK: Decimal = Decimal::from_parts(2_737_067_636, 0, 0, false, 9);
// 425_170_068_027 and 353_982_300_885 exceed u32, so they are split into lo/mid words.
const L_PER_100KM_TO_GP10K_US: Decimal = Decimal::from_parts(4_263_273_019, 98, 0, false, 10);
const L_PER_100KM_TO_GP10K_UK: Decimal = Decimal::from_parts(1_794_982_613, 82, 0, false, 10);

/// Fraction digits kept when reporting consumption figures.
pub const CONSUMPTION_SCALE: u32 = 2;

/// Unit used for odometer readings and trip distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
    #[default]
    Kilometer,
    StatuteMile,
}

impl DistanceUnit {
    /// Default distance unit for a region code such as `US` or `DE`.
    #[must_use]
    pub fn for_region(region: Option<&str>) -> Self {
        if is_us(region) {
            Self::StatuteMile
        } else {
            Self::Kilometer
        }
    }

    /// String representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Kilometer => "km",
            Self::StatuteMile => "mi",
        }
    }

    #[must_use]
    pub const fn is_metric(self) -> bool {
        matches!(self, Self::Kilometer)
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "km" | "kilometer" => Ok(Self::Kilometer),
            "mi" | "statute_mile" => Ok(Self::StatuteMile),
            _ => Err(ValidationError::UnknownUnit {
                kind: "distance",
                value: s.to_string(),
            }),
        }
    }
}

/// Unit used for fuel volumes and for the price basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VolumeUnit {
    #[default]
    Liter,
    GallonUs,
    GallonUk,
}

impl VolumeUnit {
    /// Default volume unit for a region code.
    #[must_use]
    pub fn for_region(region: Option<&str>) -> Self {
        if is_us(region) {
            Self::GallonUs
        } else {
            Self::Liter
        }
    }

    /// Gallon flavour assumed when a source only says "gallons".
    #[must_use]
    pub fn default_gallon(region: Option<&str>) -> Self {
        if Self::for_region(region) == Self::GallonUs {
            Self::GallonUs
        } else {
            Self::GallonUk
        }
    }

    /// String representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Liter => "l",
            Self::GallonUs => "gal_us",
            Self::GallonUk => "gal_uk",
        }
    }

    #[must_use]
    pub const fn is_metric(self) -> bool {
        matches!(self, Self::Liter)
    }
}

impl fmt::Display for VolumeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VolumeUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l" | "liter" => Ok(Self::Liter),
            "gal_us" | "gallon_us" => Ok(Self::GallonUs),
            "gal_uk" | "gallon_uk" => Ok(Self::GallonUk),
            _ => Err(ValidationError::UnknownUnit {
                kind: "volume",
                value: s.to_string(),
            }),
        }
    }
}

/// Unit used to report fuel consumption or efficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionUnit {
    #[default]
    LitersPer100Km,
    KilometersPerLiter,
    MilesPerGallonUs,
    MilesPerGallonUk,
    GallonsPer10kMilesUs,
    GallonsPer10kMilesUk,
}

impl ConsumptionUnit {
    /// Default consumption unit for a region code.
    #[must_use]
    pub fn for_region(region: Option<&str>) -> Self {
        if is_us(region) {
            Self::MilesPerGallonUs
        } else {
            Self::LitersPer100Km
        }
    }

    /// String representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LitersPer100Km => "l_per_100km",
            Self::KilometersPerLiter => "km_per_l",
            Self::MilesPerGallonUs => "mpg_us",
            Self::MilesPerGallonUk => "mpg_uk",
            Self::GallonsPer10kMilesUs => "gp10k_us",
            Self::GallonsPer10kMilesUk => "gp10k_uk",
        }
    }

    /// Short label shown next to consumption figures.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::LitersPer100Km => "l/100km",
            Self::KilometersPerLiter => "km/l",
            Self::MilesPerGallonUs => "mpg",
            Self::MilesPerGallonUk => "mpg.uk",
            Self::GallonsPer10kMilesUs => "gp10k",
            Self::GallonsPer10kMilesUk => "gp10k.uk",
        }
    }

    /// Whether larger values mean a more economical car.
    #[must_use]
    pub const fn is_efficiency(self) -> bool {
        matches!(
            self,
            Self::KilometersPerLiter | Self::MilesPerGallonUs | Self::MilesPerGallonUk
        )
    }
}

impl fmt::Display for ConsumptionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsumptionUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l_per_100km" | "l/100km" => Ok(Self::LitersPer100Km),
            "km_per_l" | "km/l" => Ok(Self::KilometersPerLiter),
            "mpg_us" | "mpg" => Ok(Self::MilesPerGallonUs),
            "mpg_uk" | "mpg.uk" => Ok(Self::MilesPerGallonUk),
            "gp10k_us" | "gp10k" => Ok(Self::GallonsPer10kMilesUs),
            "gp10k_uk" | "gp10k.uk" => Ok(Self::GallonsPer10kMilesUk),
            _ => Err(ValidationError::UnknownUnit {
                kind: "consumption",
                value: s.to_string(),
            }),
        }
    }
}

fn is_us(region: Option<&str>) -> bool {
    region.is_some_and(|region| region.eq_ignore_ascii_case("US"))
}

/// Converts a distance in `unit` to kilometers.
#[must_use]
pub fn kilometers_for_distance(distance: Decimal, unit: DistanceUnit) -> Decimal {
    match unit {
        DistanceUnit::Kilometer => distance,
        DistanceUnit::StatuteMile => distance.saturating_mul(KILOMETERS_PER_STATUTE_MILE),
    }
}

/// Converts kilometers to a distance in `unit`.
#[must_use]
pub fn distance_for_kilometers(kilometers: Decimal, unit: DistanceUnit) -> Decimal {
    match unit {
        DistanceUnit::Kilometer => kilometers,
        DistanceUnit::StatuteMile => kilometers / KILOMETERS_PER_STATUTE_MILE,
    }
}

/// Converts a volume in `unit` to liters.
#[must_use]
pub fn liters_for_volume(volume: Decimal, unit: VolumeUnit) -> Decimal {
    match unit {
        VolumeUnit::Liter => volume,
        VolumeUnit::GallonUs => volume.saturating_mul(LITERS_PER_US_GALLON),
        VolumeUnit::GallonUk => volume.saturating_mul(LITERS_PER_IMPERIAL_GALLON),
    }
}

/// Converts liters to a volume in `unit`.
#[must_use]
pub fn volume_for_liters(liters: Decimal, unit: VolumeUnit) -> Decimal {
    match unit {
        VolumeUnit::Liter => liters,
        VolumeUnit::GallonUs => liters / LITERS_PER_US_GALLON,
        VolumeUnit::GallonUk => liters / LITERS_PER_IMPERIAL_GALLON,
    }
}

/// Converts a price per `unit` to a price per liter.
#[must_use]
pub fn price_per_liter(price: Decimal, unit: VolumeUnit) -> Decimal {
    match unit {
        VolumeUnit::Liter => price,
        VolumeUnit::GallonUs => price / LITERS_PER_US_GALLON,
        VolumeUnit::GallonUk => price / LITERS_PER_IMPERIAL_GALLON,
    }
}

/// Converts a price per liter to a price per `unit`.
#[must_use]
pub fn price_per_unit(liter_price: Decimal, unit: VolumeUnit) -> Decimal {
    match unit {
        VolumeUnit::Liter => liter_price,
        VolumeUnit::GallonUs => liter_price.saturating_mul(LITERS_PER_US_GALLON),
        VolumeUnit::GallonUk => liter_price.saturating_mul(LITERS_PER_IMPERIAL_GALLON),
    }
}

/// Computes consumption (or efficiency) for a distance and fuel volume.
///
/// Returns `None` when either quantity is not positive, the decimal
/// equivalent of a non-finite result. Values are rounded half away from
/// zero to [`CONSUMPTION_SCALE`] fraction digits.
#[must_use]
pub fn consumption(kilometers: Decimal, liters: Decimal, unit: ConsumptionUnit) -> Option<Decimal> {
    if kilometers <= Decimal::ZERO || liters <= Decimal::ZERO {
        return None;
    }

    let value = if unit.is_efficiency() {
        let km_per_liter = kilometers.checked_div(liters)?;
        match unit {
            ConsumptionUnit::MilesPerGallonUs => km_per_liter.checked_mul(KM_PER_LITER_TO_MPG_US)?,
            ConsumptionUnit::MilesPerGallonUk => km_per_liter.checked_mul(KM_PER_LITER_TO_MPG_UK)?,
            _ => km_per_liter,
        }
    } else {
        let liters_per_100km = liters
            .checked_mul(Decimal::ONE_HUNDRED)?
            .checked_div(kilometers)?;
        match unit {
            ConsumptionUnit::GallonsPer10kMilesUs => {
                liters_per_100km.checked_mul(L_PER_100KM_TO_GP10K_US)?
            }
            ConsumptionUnit::GallonsPer10kMilesUk => {
                liters_per_100km.checked_mul(L_PER_100KM_TO_GP10K_UK)?
            }
            _ => liters_per_100km,
        }
    };

    Some(value.round_dp_with_strategy(CONSUMPTION_SCALE, RoundingStrategy::MidpointAwayFromZero))
}

#[cfg(test)]
mod tests {
    use super::*;

    use rust_decimal_macros::dec;

    #[test]
    fn conversion_constants_are_exact() {
        assert_eq!(KILOMETERS_PER_STATUTE_MILE, dec!(1.609344));
        assert_eq!(LITERS_PER_US_GALLON, dec!(3.785411784));
        assert_eq!(LITERS_PER_IMPERIAL_GALLON, dec!(4.54609));
        assert_eq!(L_PER_100KM_TO_GP10K_US, dec!(42.5170068027));
        assert_eq!(L_PER_100KM_TO_GP10K_UK, dec!(35.3982300885));
    }

    #[test]
    fn miles_convert_to_kilometers() {
        assert_eq!(
            kilometers_for_distance(dec!(100), DistanceUnit::StatuteMile),
            dec!(160.9344)
        );
        assert_eq!(
            kilometers_for_distance(dec!(100), DistanceUnit::Kilometer),
            dec!(100)
        );
    }

    #[test]
    fn gallons_convert_to_liters() {
        assert_eq!(
            liters_for_volume(dec!(10), VolumeUnit::GallonUs),
            dec!(37.85411784)
        );
        assert_eq!(
            liters_for_volume(dec!(2), VolumeUnit::GallonUk),
            dec!(9.09218)
        );
    }

    #[test]
    fn price_per_gallon_roundtrips_through_liters() {
        let per_liter = price_per_liter(dec!(3.785411784), VolumeUnit::GallonUs);
        assert_eq!(per_liter, dec!(1));
        assert_eq!(price_per_unit(per_liter, VolumeUnit::GallonUs), dec!(3.785411784));
    }

    #[test]
    fn consumption_in_liters_per_100km() {
        let value = consumption(dec!(626), dec!(28.43), ConsumptionUnit::LitersPer100Km);
        assert_eq!(value, Some(dec!(4.54)));
    }

    #[test]
    fn consumption_as_efficiency() {
        let value = consumption(dec!(500), dec!(25), ConsumptionUnit::KilometersPerLiter);
        assert_eq!(value, Some(dec!(20)));
    }

    #[test]
    fn consumption_is_undefined_without_distance_or_fuel() {
        assert_eq!(
            consumption(dec!(0), dec!(5), ConsumptionUnit::LitersPer100Km),
            None
        );
        assert_eq!(
            consumption(dec!(100), dec!(0), ConsumptionUnit::MilesPerGallonUs),
            None
        );
    }

    #[test]
    fn region_defaults() {
        assert_eq!(DistanceUnit::for_region(Some("US")), DistanceUnit::StatuteMile);
        assert_eq!(DistanceUnit::for_region(Some("DE")), DistanceUnit::Kilometer);
        assert_eq!(VolumeUnit::for_region(None), VolumeUnit::Liter);
        assert_eq!(VolumeUnit::default_gallon(Some("us")), VolumeUnit::GallonUs);
        assert_eq!(VolumeUnit::default_gallon(Some("GB")), VolumeUnit::GallonUk);
        assert_eq!(
            ConsumptionUnit::for_region(Some("US")),
            ConsumptionUnit::MilesPerGallonUs
        );
    }

    #[test]
    fn unit_tags_roundtrip() {
        for unit in [VolumeUnit::Liter, VolumeUnit::GallonUs, VolumeUnit::GallonUk] {
            assert_eq!(unit.as_str().parse::<VolumeUnit>().unwrap(), unit);
        }
        assert!("furlong".parse::<DistanceUnit>().is_err());
    }
}
