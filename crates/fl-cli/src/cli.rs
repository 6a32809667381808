//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fl_core::{CarId, EventId};

use crate::commands::cars::CreateCarArgs;
use crate::commands::entry::EntryArgs;

/// Fuel log.
///
/// Imports fill-up histories from CSV exports and keeps per-car consumption
/// ledgers.
#[derive(Debug, Parser)]
#[command(name = "fl", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import a CSV export (native or TankPro format).
    Import {
        /// The file to import.
        file: PathBuf,
    },

    /// Manage cars.
    #[command(subcommand)]
    Cars(CarsAction),

    /// List the fuel events of a car.
    Events {
        /// Car ID as shown by `fl cars list`.
        car: CarId,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Record a fill-up.
    Add {
        /// Car ID as shown by `fl cars list`.
        car: CarId,

        #[command(flatten)]
        entry: EntryArgs,
    },

    /// Change the values of a fill-up.
    Edit {
        /// Event ID as shown by `fl events`.
        event: EventId,

        #[command(flatten)]
        entry: EntryArgs,
    },

    /// Delete a fill-up.
    Remove {
        /// Event ID as shown by `fl events`.
        event: EventId,
    },

    /// Rebuild the inherited amounts and totals of a car.
    Recompute {
        /// Car ID as shown by `fl cars list`.
        car: CarId,
    },

    /// Show database location and counts.
    Status,
}

/// Car subcommands.
#[derive(Debug, Subcommand)]
pub enum CarsAction {
    /// List all cars.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Create a car.
    Create(CreateCarArgs),
}
