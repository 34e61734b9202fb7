//! Injector error types

use thiserror::Error;

/// Result type for injector operations
pub type InjectorResult<T> = Result<T, InjectorError>;

#[derive(Error, Debug)]
pub enum InjectorError {
    #[error("Failed to deliver {signal} to own process: {source}")]
    SignalDelivery {
        signal: nix::sys::signal::Signal,
        source: nix::Error,
    },

    #[error("Failed to restore default handling of {signal}: {source}")]
    HandlerReset {
        signal: nix::sys::signal::Signal,
        source: nix::Error,
    },

    #[error("Fault code {code} does not map to a signal")]
    NotASignal { code: i32 },
}
