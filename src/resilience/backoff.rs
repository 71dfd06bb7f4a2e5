//! Exponential cooldown for tripped circuits.

use std::time::{Duration, Instant};

/// Largest exponent applied to the base cooldown (multiplier ×1024).
pub const MAX_COOLDOWN_EXPONENT: u32 = 10;

/// Cooldown for the `trip_count`-th consecutive circuit break.
///
/// `base * 2^min(trip_count - 1, 10)`, saturating instead of overflowing.
pub fn cooldown_for_trip(base: Duration, trip_count: u32) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }

    let exponent = trip_count.saturating_sub(1).min(MAX_COOLDOWN_EXPONENT);
    base.checked_mul(1u32 << exponent).unwrap_or(Duration::MAX)
}

/// `now + cooldown`, shrinking the cooldown until the instant is representable.
pub fn deadline_after(now: Instant, cooldown: Duration) -> Instant {
    let mut cooldown = cooldown;
    loop {
        if let Some(deadline) = now.checked_add(cooldown) {
            return deadline;
        }
        cooldown /= 2;
    }
}
