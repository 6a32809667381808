//! Recognizing column roles from a table header.
//!
//! Column names are compared in canonical form (see
//! [`simplify_header_name`](crate::tabular::simplify_header_name)). Each
//! role has a list of synonyms from the supported export formats, tried in
//! order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::units::{DistanceUnit, VolumeUnit};

const DATE: &[&str] = &["JJJJMMTT", "YYYYMMDD", "DATE", "DATUM", "AAAAMMJJ"];
const TIME: &[&str] = &["HHMM", "TIME", "ZEIT"];
const TRIP_KILOMETERS: &[&str] = &["KILOMETERS", "KILOMETER", "STRECKE", "KILOMÈTRES"];
const TRIP_MILES: &[&str] = &["MILES", "MEILEN"];
const ODOMETER_KILOMETERS: &[&str] = &["ODOMETER(KM)", "KILOMETERSTAND(KM)"];
const ODOMETER_MILES: &[&str] = &["ODOMETER(MI)", "KILOMETERSTAND(MI)"];
const VOLUME_LITERS: &[&str] = &["LITERS", "LITER", "TANKMENGE", "LITRES"];
const VOLUME_US_GALLONS: &[&str] = &["GALLONS(US)", "GALLONEN(US)"];
const VOLUME_UK_GALLONS: &[&str] = &["GALLONS(UK)", "GALLONEN(UK)"];
const VOLUME_AMOUNT: &[&str] = &["GETANKT", "AMOUNTFILLED"];
// MAFLEINHEIT is MASSEINHEIT from a Windows file read as Mac Roman.
const VOLUME_UNIT: &[&str] = &["MASSEINHEIT", "UNIT", "MAFLEINHEIT"];
const PRICE: &[&str] = &[
    "PRICEPERLITER",
    "PRICEPERGALLON",
    "PRICE",
    "PREISPROLITER",
    "PREISPROGALLONE",
    "PREIS",
    "KOSTEN/LITER",
    "PRIXPARLITRE",
    "PRIXPARGALLON",
];
const FILL_UP: &[&str] = &["FULLFILLUP", "VOLLGETANKT", "RÉSERVOIRPLEIN"];
const MODEL: &[&str] = &["MODEL", "MODELL"];
const CAR_ID: &[&str] = &["CARID", "FAHRZEUGID"];
const COMMENT: &[&str] = &["COMMENT", "KOMMENTAR", "COMMENTAIRE"];

/// Column holding the car ID in a car table.
pub const CAR_TABLE_ID: &str = "ID";
/// Column holding the number plate in a car table.
pub const CAR_TABLE_PLATE: &str = "NAME";

/// One of the two recognized export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// The application's own export, one car per file.
    Native,
    /// Multi-car exports with a separate car table.
    TankPro,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::TankPro => f.write_str("tankpro"),
        }
    }
}

/// A column together with the unit its values are written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitColumn<U> {
    pub name: String,
    pub unit: U,
}

/// Where the fuel volume of a record comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeColumn {
    /// A single column whose header names the unit.
    Fixed(UnitColumn<VolumeUnit>),
    /// An amount column next to a per-row unit column.
    Amount { amount: String, unit: String },
}

/// Column roles of a car table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarColumns {
    pub id: String,
    pub model: String,
    pub plate: String,
}

impl CarColumns {
    /// Recognizes a car table: at least three columns including `ID`, a
    /// model column and `NAME`.
    pub fn detect(header: &[String]) -> Option<Self> {
        if header.len() < 3 {
            return None;
        }
        let id = find(header, &[CAR_TABLE_ID])?;
        let model = find(header, MODEL)?;
        let plate = find(header, &[CAR_TABLE_PLATE])?;
        Some(Self { id, model, plate })
    }
}

/// Column roles of a table holding fuel events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventColumns {
    pub date: String,
    pub time: Option<String>,
    pub trip: Option<UnitColumn<DistanceUnit>>,
    pub odometer: Option<UnitColumn<DistanceUnit>>,
    pub volume: VolumeColumn,
    pub price: String,
    pub fill_up: Option<String>,
    pub comment: Option<String>,
    pub car_id: Option<String>,
}

impl EventColumns {
    /// Recognizes an event table for the given dialect.
    ///
    /// Every event table needs a date, a trip distance or odometer, a volume
    /// and a price. TankPro tables must additionally carry a car ID, an
    /// odometer instead of trip distances, an amount/unit volume pair and a
    /// fill-up flag.
    pub fn detect(header: &[String], dialect: Dialect) -> Option<Self> {
        let date = find(header, DATE)?;
        let time = find(header, TIME);
        let trip = find_with_unit(
            header,
            &[
                (TRIP_KILOMETERS, DistanceUnit::Kilometer),
                (TRIP_MILES, DistanceUnit::StatuteMile),
            ],
        );
        let odometer = find_with_unit(
            header,
            &[
                (ODOMETER_KILOMETERS, DistanceUnit::Kilometer),
                (ODOMETER_MILES, DistanceUnit::StatuteMile),
            ],
        );
        let fixed_volume = find_with_unit(
            header,
            &[
                (VOLUME_LITERS, VolumeUnit::Liter),
                (VOLUME_US_GALLONS, VolumeUnit::GallonUs),
                (VOLUME_UK_GALLONS, VolumeUnit::GallonUk),
            ],
        );
        let volume_amount = find(header, VOLUME_AMOUNT);
        let volume_unit = find(header, VOLUME_UNIT);
        let price = find(header, PRICE)?;
        let fill_up = find(header, FILL_UP);
        let comment = find(header, COMMENT);
        let car_id = find(header, CAR_ID);

        if trip.is_none() && odometer.is_none() {
            return None;
        }

        if dialect == Dialect::TankPro
            && (car_id.is_none()
                || trip.is_some()
                || odometer.is_none()
                || fixed_volume.is_some()
                || volume_unit.is_none()
                || fill_up.is_none())
        {
            return None;
        }

        let volume = match (fixed_volume, volume_amount, volume_unit) {
            (Some(column), _, _) => VolumeColumn::Fixed(column),
            (None, Some(amount), Some(unit)) => VolumeColumn::Amount { amount, unit },
            _ => return None,
        };

        Some(Self {
            date,
            time,
            trip,
            odometer,
            volume,
            price,
            fill_up,
            comment,
            car_id,
        })
    }
}

fn find(header: &[String], synonyms: &[&str]) -> Option<String> {
    synonyms
        .iter()
        .find(|synonym| header.iter().any(|column| column == *synonym))
        .map(|synonym| (*synonym).to_string())
}

fn find_with_unit<U: Copy>(header: &[String], groups: &[(&[&str], U)]) -> Option<UnitColumn<U>> {
    groups.iter().find_map(|(synonyms, unit)| {
        find(header, synonyms).map(|name| UnitColumn { name, unit: *unit })
    })
}
