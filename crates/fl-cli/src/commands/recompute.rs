//! Recompute command for rebuilding a car's ledger from its events.

use std::io::Write;

use anyhow::{Context, Result};
use fl_core::units::{distance_for_kilometers, volume_for_liters};
use fl_core::{Car, CarId, recompute_car};
use fl_db::Database;

use super::util::{format_amount, require_car};

/// Re-derives inherited amounts and totals of one car.
pub fn run<W: Write>(writer: &mut W, db: &mut Database, car_id: CarId) -> Result<Car> {
    let mut work = db.working_copy().context("failed to open database transaction")?;
    require_car(&work, car_id)?;
    let car = recompute_car(&mut work, car_id)
        .with_context(|| format!("failed to recompute car {car_id}"))?;
    work.commit().context("failed to save recomputed ledger")?;

    writeln!(
        writer,
        "Recomputed car {} ({}): {} {} driven, {} {} fuel",
        car.id,
        car.name,
        format_amount(distance_for_kilometers(car.distance_total_sum, car.odometer_unit), 1),
        car.odometer_unit.as_str(),
        format_amount(volume_for_liters(car.fuel_volume_total_sum, car.volume_unit), 2),
        car.volume_unit.as_str(),
    )?;
    Ok(car)
}
