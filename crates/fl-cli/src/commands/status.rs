//! Status command for showing the database location and contents.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use fl_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    let stats = db.stats().context("failed to count rows")?;

    writeln!(writer, "Fuel log status")?;
    writeln!(writer, "Database: {}", database_path.display())?;

    if stats.cars == 0 {
        writeln!(writer, "No cars recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Cars: {}", stats.cars)?;
    writeln!(writer, "Fuel events: {}", stats.events)?;

    Ok(())
}
