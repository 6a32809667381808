//! Shared utilities for CLI commands.

use anyhow::Context;
use fl_core::{Car, CarId, EventStore};
use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds half away from zero and pads to exactly `scale` fraction digits.
pub fn format_amount(value: Decimal, scale: u32) -> String {
    let rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.width$}", width = scale as usize)
}

/// Loads a car or fails with a message naming the ID.
pub fn require_car<S>(store: &S, id: CarId) -> anyhow::Result<Car>
where
    S: EventStore,
{
    store
        .car(id)
        .with_context(|| format!("failed to load car {id}"))?
        .with_context(|| format!("unknown car: {id}"))
}
