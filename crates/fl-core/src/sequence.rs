//! Chronological ordering of a car's events.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

/// Minimum gap, in seconds, between an event and a colliding predecessor.
pub const NUDGE_MARGIN_SECONDS: i64 = 60;

/// Ordering key of an imported record: timestamp, then odometer reading.
/// Missing values order first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    pub timestamp: Option<DateTime<Utc>>,
    pub odometer: Option<Decimal>,
}

/// Stably sorts `items` by the key extracted with `key`.
pub fn sort_chronologically<T>(items: &mut [T], key: impl Fn(&T) -> SortKey) {
    items.sort_by(|a, b| key(a).cmp(&key(b)));
}

/// Moves colliding timestamps forward so that every accepted event is
/// strictly later than the one before it.
///
/// A timestamp at or before the last accepted one is shifted past it by the
/// gap plus a minute, rounded up to whole seconds. Once an event has been
/// shifted, the next one is looked at again even if it is already later.
#[derive(Debug, Clone, Default)]
pub struct TimestampNudger {
    last: Option<DateTime<Utc>>,
    last_delta: TimeDelta,
}

impl TimestampNudger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the timestamp to use for `candidate`, or `None` if it cannot
    /// be placed after the last accepted event.
    pub fn place(&mut self, candidate: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let delta = self.last.map(|last| candidate - last);
        let later = delta.is_none_or(|delta| delta > TimeDelta::zero());

        let mut placed = candidate;
        if !later || self.last_delta > TimeDelta::zero() {
            self.last_delta = match delta {
                Some(delta) if !later => {
                    round_up_to_seconds(delta.abs() + TimeDelta::seconds(NUDGE_MARGIN_SECONDS))
                }
                _ => TimeDelta::zero(),
            };
            placed = candidate + self.last_delta;
        }

        match self.last {
            Some(last) if placed <= last => None,
            _ => Some(placed),
        }
    }

    /// Records `timestamp` as the last accepted event.
    pub fn accept(&mut self, timestamp: DateTime<Utc>) {
        self.last = Some(timestamp);
    }

    pub const fn last(&self) -> Option<DateTime<Utc>> {
        self.last
    }
}

fn round_up_to_seconds(delta: TimeDelta) -> TimeDelta {
    let seconds = delta.num_seconds();
    if delta > TimeDelta::seconds(seconds) {
        TimeDelta::seconds(seconds + 1)
    } else {
        TimeDelta::seconds(seconds)
    }
}
