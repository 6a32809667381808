//! CLI subcommand implementations.

pub mod cars;
pub mod entry;
pub mod events;
pub mod import;
pub mod recompute;
pub mod status;
mod util;
