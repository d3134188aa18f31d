use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerError {
    /// An elapsed time was requested, or the scope closed, before `enter`.
    #[error("timer has not been started")]
    NotStarted,
}
