//! Fault injector for fault-detection test fixtures
//!
//! Maps an integer fault code to a deterministic destructive action against
//! the current process: a null-page read, a hardware divide by zero, or a
//! self-directed signal. Unrecognized codes are a logged no-op so a harness
//! can run a control case through the same fixture.

pub mod error;
pub mod fault;
pub mod serial;
pub mod services;
pub mod traits;

pub use error::{InjectorError, InjectorResult};
pub use fault::FaultSignal;
pub use services::ProcessFaultInjector;
pub use traits::{FaultInjector, FaultOutcome, MockFaultInjector};
