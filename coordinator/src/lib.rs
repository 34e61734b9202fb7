//! Participant coordination for multi-process fault fixtures
//!
//! A fixed-size group of processes rendezvous, greet the coordinator
//! (rank 0), receive the run parameters it resolves, and follow the shared
//! schedule: sleep, let exactly one participant fail, sleep again, and
//! report back. The group transport, its launcher and the schedules all live
//! here; the destructive actions come from the `injector` crate.

pub mod config;
pub mod error;
pub mod protocol;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::GroupConfig;
pub use error::{CoordinatorError, CoordinatorResult};
pub use protocol::{run_faulty_parallel_sleep, run_parallel_sleep, ParticipantOutcome, RunReport, SleepReport};
pub use services::{GroupLauncher, RankExit, RealGroupCommunicator};
pub use traits::GroupCommunicator;
