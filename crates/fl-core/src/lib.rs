//! Core domain logic for the fuel log.
//!
//! This crate contains:
//! - Import: parsing CSV exports of unknown dialect, locale and units
//! - Ledger: carrying partial fill-ups forward to the next full fill-up
//! - Store: the persistence boundary, with an in-memory implementation

pub mod disambiguate;
pub mod import;
pub mod ledger;
pub mod locale;
pub mod model;
pub mod normalize;
pub mod sequence;
pub mod sniff;
pub mod store;
pub mod tabular;
pub mod types;
pub mod units;

pub use import::{ImportError, ImportSummary, Importer};
pub use ledger::{LedgerError, LedgerRun, add_event, rebuild, recompute_car, remove_event, replace_event};
pub use locale::Locale;
pub use model::{Car, FuelEntry, FuelEvent, Inherited, NewCar};
pub use normalize::Normalizer;
pub use store::{EventRange, EventStore, MemoryStore, MemoryStoreError};
pub use types::{CarId, EventId, ValidationError};
pub use units::{ConsumptionUnit, DistanceUnit, VolumeUnit};
