use std::fmt;
use std::time::Duration;

/// Elapsed time recorded when a timed scope closes
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Elapsed {
    pub seconds: f64,
    pub milliseconds: f64,
}

impl Elapsed {
    pub fn from_seconds(seconds: f64) -> Self {
        Self {
            seconds,
            milliseconds: seconds * 1000.0,
        }
    }

    /// `None` when the source went backwards or produced a non-finite value.
    pub fn as_duration(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.seconds).ok()
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}ms", self.milliseconds)
    }
}
