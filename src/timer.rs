//! Scoped wall-clock timer
//!
//! A [`Timer`] moves through `Unstarted -> Running -> Finished`. Entering
//! records `start`, exiting records `end` and the derived [`Elapsed`] value.
//! Entering again simply overwrites the previous run.

use std::fmt;
use std::ops::Deref;

use tracing::{debug, info, trace};

use crate::clock::{DefaultSource, default_timer};
use crate::elapsed::Elapsed;
use crate::error::TimerError;
use walltimer_config::get_config;

/// Lifecycle of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Unstarted,
    Running,
    Finished,
}

/// Wall-clock timer over a pluggable time source.
///
/// Not meant to be shared: one timer measures one scope at a time.
pub struct Timer<S = DefaultSource> {
    source: S,
    label: Option<String>,
    report: bool,
    start: Option<f64>,
    end: Option<f64>,
    recorded: Option<Elapsed>,
}

impl Timer {
    /// Create a timer reading [`default_timer`].
    pub fn new() -> Self {
        Self::with_source(default_timer)
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Timer<S>
where
    S: Fn() -> f64,
{
    /// Create a timer reading a custom source.
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            label: None,
            report: get_config().report_on_exit(),
            start: None,
            end: None,
            recorded: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Log finished scopes at `info` rather than `debug`.
    pub fn with_report(mut self, report: bool) -> Self {
        self.report = report;
        self
    }

    /// Current reading of the time source. Scope state is left untouched.
    pub fn now(&self) -> f64 {
        (self.source)()
    }

    /// Open the timed scope.
    pub fn enter(&mut self) -> &mut Self {
        let start = self.now();
        self.start = Some(start);
        self.end = None;
        self.recorded = None;
        trace!(label = self.label_or_default(), start, "timer scope entered");
        self
    }

    /// Close the timed scope and record the elapsed time.
    pub fn exit(&mut self) -> Result<Elapsed, TimerError> {
        let start = self.start.ok_or(TimerError::NotStarted)?;
        Ok(self.finish(start))
    }

    /// Open the scope and close it when the returned guard drops.
    ///
    /// The guard closes the scope on every exit path, unwinding included.
    pub fn scope(&mut self) -> TimerGuard<'_, S> {
        self.enter();
        TimerGuard {
            timer: self,
            closed: false,
        }
    }

    /// Run `work` inside the timed scope and hand back its output unchanged.
    ///
    /// `end` is recorded before an error value is returned or a panic
    /// continues to unwind.
    pub fn measure<T, F>(&mut self, work: F) -> T
    where
        F: FnOnce(&Self) -> T,
    {
        let guard = self.scope();
        let output = work(&*guard);
        drop(guard);
        output
    }

    /// Elapsed seconds: live while running, fixed once finished.
    pub fn elapsed_seconds(&self) -> Result<f64, TimerError> {
        let start = self.start.ok_or(TimerError::NotStarted)?;
        Ok(match self.end {
            Some(end) => end - start,
            None => self.now() - start,
        })
    }

    /// Elapsed milliseconds, same policy as [`Timer::elapsed_seconds`].
    pub fn elapsed_milliseconds(&self) -> Result<f64, TimerError> {
        self.elapsed_seconds().map(|seconds| seconds * 1000.0)
    }

    fn finish(&mut self, start: f64) -> Elapsed {
        let end = self.now();
        self.end = Some(end);

        let elapsed = Elapsed::from_seconds(end - start);
        self.recorded = Some(elapsed);

        let label = self.label_or_default();
        if self.report {
            info!(label, elapsed_ms = elapsed.milliseconds, "timer scope finished");
        } else {
            debug!(label, elapsed_ms = elapsed.milliseconds, "timer scope finished");
        }

        elapsed
    }
}

impl<S> Timer<S> {
    pub fn start(&self) -> Option<f64> {
        self.start
    }

    pub fn end(&self) -> Option<f64> {
        self.end
    }

    /// Values cached when the scope last closed.
    pub fn recorded(&self) -> Option<Elapsed> {
        self.recorded
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn state(&self) -> TimerState {
        match (self.start, self.end) {
            (None, _) => TimerState::Unstarted,
            (Some(_), None) => TimerState::Running,
            (Some(_), Some(_)) => TimerState::Finished,
        }
    }

    fn label_or_default(&self) -> &str {
        self.label.as_deref().unwrap_or("timer")
    }
}

impl<S> fmt::Debug for Timer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("label", &self.label)
            .field("report", &self.report)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("recorded", &self.recorded)
            .finish_non_exhaustive()
    }
}

/// A running timer is formatted from a fresh reading, so formatting advances
/// stateful sources.
impl<S> fmt::Display for Timer<S>
where
    S: Fn() -> f64,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{label}: ")?;
        }
        match self.elapsed_seconds() {
            Ok(seconds) => write!(f, "{}", Elapsed::from_seconds(seconds)),
            Err(_) => write!(f, "not started"),
        }
    }
}

/// Open timed scope; closes the scope on drop
pub struct TimerGuard<'a, S>
where
    S: Fn() -> f64,
{
    timer: &'a mut Timer<S>,
    closed: bool,
}

impl<S> TimerGuard<'_, S>
where
    S: Fn() -> f64,
{
    /// Close the scope now and return the recorded time.
    pub fn close(mut self) -> Result<Elapsed, TimerError> {
        self.closed = true;
        self.timer.exit()
    }
}

impl<S> Deref for TimerGuard<'_, S>
where
    S: Fn() -> f64,
{
    type Target = Timer<S>;

    fn deref(&self) -> &Self::Target {
        self.timer
    }
}

impl<S> Drop for TimerGuard<'_, S>
where
    S: Fn() -> f64,
{
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.timer.exit();
        }
    }
}

impl<S> fmt::Debug for TimerGuard<'_, S>
where
    S: Fn() -> f64,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerGuard")
            .field("timer", &self.timer)
            .field("closed", &self.closed)
            .finish()
    }
}

/// Time `work` with the default source.
pub fn timed<T, F>(work: F) -> (T, Elapsed)
where
    F: FnOnce() -> T,
{
    let mut timer = Timer::new();
    let output = timer.measure(|_| work());
    (output, timer.recorded().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::panic::{self, AssertUnwindSafe};

    /// Yields `readings` in order, repeating the last one once exhausted.
    fn stepping(readings: Vec<f64>) -> impl Fn() -> f64 {
        let next = Cell::new(0usize);
        move || {
            let index = next.get();
            next.set(index + 1);
            readings[index.min(readings.len() - 1)]
        }
    }

    /// Yields 0.0, 1.0, 2.0, ...
    fn counter() -> impl Fn() -> f64 {
        let value = Cell::new(0.0);
        move || {
            let current = value.get();
            value.set(current + 1.0);
            current
        }
    }

    #[test]
    fn test_enter_exit_with_stub_source() {
        let mut timer = Timer::with_source(stepping(vec![100.0, 100.5]));
        timer.enter();
        let elapsed = timer.exit().unwrap();

        assert_eq!(timer.start(), Some(100.0));
        assert_eq!(timer.end(), Some(100.5));
        assert_eq!(timer.elapsed_seconds(), Ok(0.5));
        assert_eq!(timer.elapsed_milliseconds(), Ok(500.0));
        assert_eq!(elapsed, Elapsed::from_seconds(0.5));
        assert_eq!(timer.recorded().unwrap().milliseconds, 500.0);
        assert_eq!(timer.state(), TimerState::Finished);
    }

    #[test]
    fn test_live_then_fixed_elapsed() {
        let mut timer = Timer::with_source(counter());
        timer.enter();
        assert_eq!(timer.start(), Some(0.0));
        assert_eq!(timer.state(), TimerState::Running);

        assert_eq!(timer.elapsed_seconds(), Ok(1.0));
        assert_eq!(timer.end(), None);

        timer.exit().unwrap();
        assert_eq!(timer.end(), Some(2.0));
        assert_eq!(timer.elapsed_seconds(), Ok(2.0));
        assert_eq!(timer.now(), 3.0);
        assert_eq!(timer.elapsed_seconds(), Ok(2.0));
        assert_eq!(timer.elapsed_milliseconds(), Ok(2000.0));
    }

    #[test]
    fn test_not_started() {
        let mut timer = Timer::with_source(counter());

        assert_eq!(timer.state(), TimerState::Unstarted);
        assert_eq!(timer.elapsed_seconds(), Err(TimerError::NotStarted));
        assert_eq!(timer.elapsed_milliseconds(), Err(TimerError::NotStarted));
        assert_eq!(timer.exit(), Err(TimerError::NotStarted));
        assert_eq!(timer.end(), None);
        assert_eq!(timer.recorded(), None);
        // the source was never read
        assert_eq!(timer.now(), 0.0);
        assert_eq!(
            TimerError::NotStarted.to_string(),
            "timer has not been started"
        );
    }

    #[test]
    fn test_now_leaves_scope_untouched() {
        let timer = Timer::with_source(stepping(vec![4.0, 7.0]));
        assert_eq!(timer.now(), 4.0);
        assert_eq!(timer.now(), 7.0);
        assert_eq!(timer.start(), None);
        assert_eq!(timer.end(), None);
    }

    #[test]
    fn test_live_query_is_non_decreasing() {
        let mut timer = Timer::new();
        timer.enter();
        let first = timer.elapsed_seconds().unwrap();
        let second = timer.elapsed_seconds().unwrap();
        assert!(first >= 0.0);
        assert!(second >= first);
        assert_eq!(timer.end(), None);
    }

    #[test]
    fn test_milliseconds_are_seconds_times_thousand() {
        let mut timer = Timer::with_source(stepping(vec![1.1, 2.2, 2.2, 3.3]));
        timer.enter();

        let live = timer.elapsed_seconds().unwrap();
        let live_ms = timer.elapsed_milliseconds().unwrap();
        assert_eq!(live_ms, live * 1000.0);

        timer.exit().unwrap();
        let seconds = timer.elapsed_seconds().unwrap();
        assert_eq!(timer.elapsed_milliseconds(), Ok(seconds * 1000.0));
        assert_eq!(timer.recorded().unwrap().seconds, seconds);
        assert_eq!(timer.recorded().unwrap().milliseconds, seconds * 1000.0);
    }

    #[test]
    fn test_measure_returns_error_unchanged() {
        let mut timer = Timer::with_source(counter());
        let result: Result<u32, String> = timer.measure(|t| {
            assert_eq!(t.state(), TimerState::Running);
            Err("work failed".to_string())
        });

        assert_eq!(result, Err("work failed".to_string()));
        assert_eq!(timer.state(), TimerState::Finished);
        assert_eq!(timer.end(), Some(1.0));
        assert_eq!(timer.elapsed_seconds(), Ok(1.0));
    }

    #[test]
    fn test_measure_records_end_on_panic() {
        let mut timer = Timer::with_source(counter());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            timer.measure(|_| -> u32 { panic!("boom") })
        }));

        assert!(outcome.is_err());
        assert_eq!(timer.start(), Some(0.0));
        assert_eq!(timer.end(), Some(1.0));
        assert_eq!(timer.recorded(), Some(Elapsed::from_seconds(1.0)));
    }

    #[test]
    fn test_scope_guard() {
        let mut timer = Timer::with_source(counter());
        {
            let guard = timer.scope();
            assert_eq!(guard.state(), TimerState::Running);
            assert_eq!(guard.elapsed_seconds(), Ok(1.0));
        }
        assert_eq!(timer.end(), Some(2.0));
        assert_eq!(timer.elapsed_seconds(), Ok(2.0));
    }

    #[test]
    fn test_guard_closes_on_early_return() {
        fn checked<S: Fn() -> f64>(timer: &mut Timer<S>, fail: bool) -> Result<u32, String> {
            let guard = timer.scope();
            if fail {
                return Err(format!("failed after {}", guard.elapsed_seconds().unwrap_or(0.0)));
            }
            Ok(7)
        }

        let mut timer = Timer::with_source(counter());
        assert_eq!(checked(&mut timer, true), Err("failed after 1".to_string()));
        assert_eq!(timer.end(), Some(2.0));

        assert_eq!(checked(&mut timer, false), Ok(7));
        assert_eq!(timer.start(), Some(3.0));
        assert_eq!(timer.elapsed_seconds(), Ok(1.0));
    }

    #[test]
    fn test_guard_close_finishes_once() {
        let mut timer = Timer::with_source(counter());
        let elapsed = timer.scope().close().unwrap();

        assert_eq!(elapsed.seconds, 1.0);
        assert_eq!(timer.end(), Some(1.0));
        // dropping the closed guard did not read the source again
        assert_eq!(timer.now(), 2.0);
    }

    #[test]
    fn test_reenter_overwrites_previous_run() {
        let mut timer = Timer::with_source(stepping(vec![1.0, 2.0, 10.0, 13.0]));
        timer.enter();
        timer.exit().unwrap();
        assert_eq!(timer.elapsed_seconds(), Ok(1.0));

        timer.enter();
        assert_eq!(timer.start(), Some(10.0));
        assert_eq!(timer.end(), None);
        assert_eq!(timer.recorded(), None);

        timer.exit().unwrap();
        assert_eq!(timer.elapsed_seconds(), Ok(3.0));
    }

    #[test]
    fn test_non_monotonic_source_goes_negative() {
        let mut timer = Timer::with_source(stepping(vec![5.0, 3.0]));
        timer.enter();
        let elapsed = timer.exit().unwrap();

        assert_eq!(elapsed.seconds, -2.0);
        assert_eq!(elapsed.milliseconds, -2000.0);
        assert_eq!(elapsed.as_duration(), None);
    }

    #[test]
    fn test_display() {
        let mut timer = Timer::with_source(stepping(vec![100.0, 100.5])).with_label("build");
        assert_eq!(timer.to_string(), "build: not started");

        timer.enter();
        timer.exit().unwrap();
        assert_eq!(timer.to_string(), "build: 500.000ms");
        assert_eq!(timer.label(), Some("build"));
    }

    #[test]
    fn test_report_flag() {
        let mut timer = Timer::with_source(counter())
            .with_label("reported")
            .with_report(true);
        timer.measure(|_| ());

        assert_eq!(timer.recorded().map(|e| e.milliseconds), Some(1000.0));
        assert!(format!("{timer:?}").contains("report: true"));
    }

    #[test]
    fn test_display_reads_source_while_running() {
        let mut timer = Timer::with_source(counter());
        timer.enter();

        assert_eq!(timer.to_string(), "1000.000ms");
        assert_eq!(timer.to_string(), "2000.000ms");

        timer.exit().unwrap();
        assert_eq!(timer.to_string(), "3000.000ms");
        assert_eq!(timer.to_string(), "3000.000ms");
    }

    #[test]
    fn test_timed() {
        let (sum, elapsed) = timed(|| (1..=100u32).sum::<u32>());
        assert_eq!(sum, 5050);
        assert!(elapsed.seconds >= 0.0);
        assert_eq!(elapsed.milliseconds, elapsed.seconds * 1000.0);
    }
}
