//! Shared types for the fault-injection fixtures
//!
//! Contains the fault code table, the run parameters agreed by a participant
//! group, the wire frames of the group transport, and logging setup.

pub mod errors;
pub mod logging;
pub mod messages;
pub mod types;

pub use errors::*;
pub use messages::{read_frame, write_frame, Frame, FrameKind, TEXT_TAG};
pub use types::*;
