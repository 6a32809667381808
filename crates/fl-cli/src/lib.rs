//! Fuel log CLI library.
//!
//! This crate provides the CLI interface for the fuel log.

mod cli;
pub mod commands;
mod config;
pub mod encoding;

pub use cli::{CarsAction, Cli, Commands};
pub use config::Config;
