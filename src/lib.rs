//! A timer as a scoped guard.
//!
//! Wraps a time source, a zero-argument function returning seconds. The
//! default source is [`default_timer`], a monotonic clock with a process-wide
//! epoch. This measures wall-clock time, not CPU time.
//!
//! ```
//! use walltimer::Timer;
//!
//! let mut timer = Timer::new();
//! let sum = timer.measure(|_| (0..10_000u64).sum::<u64>());
//!
//! assert_eq!(sum, 49_995_000);
//! assert!(timer.end().is_some());
//! assert!(timer.elapsed_seconds().unwrap() >= 0.0);
//! ```

pub mod clock;
pub mod elapsed;
pub mod error;
pub mod timer;

pub use clock::{DefaultSource, default_timer, system_time};
pub use elapsed::Elapsed;
pub use error::TimerError;
pub use timer::{Timer, TimerGuard, TimerState, timed};

pub use walltimer_config::{LoggingConfig, TimerConfig, get_config};
pub use walltimer_utils::init_logging;
