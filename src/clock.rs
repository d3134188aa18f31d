//! Time sources
//!
//! A time source is any `Fn() -> f64` returning seconds relative to a fixed
//! epoch. Nothing checks that a source is monotonic.

use once_cell::sync::Lazy;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Type of the source bound by [`Timer::new`](crate::Timer::new).
pub type DefaultSource = fn() -> f64;

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Monotonic seconds since the first reading taken in this process.
pub fn default_timer() -> f64 {
    EPOCH.elapsed().as_secs_f64()
}

/// Wall-clock seconds since the UNIX epoch.
///
/// Follows system clock adjustments, so two readings may go backwards.
pub fn system_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
