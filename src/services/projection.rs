//! Investment growth projection
//!
//! Fixed-rate compounding over the fractional year elapsed since purchase.
//! Recomputed on every read; the projected value is never persisted.
//!
//! Negative elapsed time (clock skew between writer and reader) clamps to
//! zero so a projection can never dip below the principal.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

/// Fixed annual percentage rate applied to investment principal.
pub const ANNUAL_RATE_PCT: f64 = 17.6;

const MILLIS_PER_YEAR: f64 = 365.0 * 24.0 * 60.0 * 60.0 * 1000.0;

/// Elapsed time between two instants as a fraction of a 365-day year,
/// clamped at zero.
pub fn year_fraction(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let elapsed_ms = (to - from).num_milliseconds() as f64;
    (elapsed_ms / MILLIS_PER_YEAR).max(0.0)
}

/// `eur_value * (1 + APR)^year_fraction`, rounded to cents.
pub fn projected_value(
    eur_value: Decimal,
    invested_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Decimal {
    let principal = eur_value.to_f64().unwrap_or(0.0);
    let growth = (1.0 + ANNUAL_RATE_PCT / 100.0).powf(year_fraction(invested_at, now));
    Decimal::from_f64(principal * growth)
        .unwrap_or(eur_value)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
