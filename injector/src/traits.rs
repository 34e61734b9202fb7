//! Injector trait definitions for dependency injection

use shared::FaultCode;

/// What became of the participant after a fault was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOutcome {
    /// The process is still running and continues its schedule
    Survived,
    /// The participant is gone; nothing after the fault step may run
    Terminated,
}

/// Performs the destructive action selected by a fault code
#[mockall::automock]
pub trait FaultInjector: Send + Sync {
    /// Print the fault description, then act on it.
    ///
    /// Terminating codes do not return when injected into a real process.
    fn inject(&self, code: FaultCode) -> FaultOutcome;
}
