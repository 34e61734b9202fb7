//! Coordinator-specific error types

use thiserror::Error;
use shared::{Rank, SharedError};

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Configuration error: {field} = {value}")]
    ConfigurationError { field: String, value: String },

    #[error("Rank {rank} is outside a group of size {size}")]
    InvalidRank { rank: Rank, size: u32 },

    #[error("Group bootstrap failed at {addr}: {message}")]
    ConnectError { addr: String, message: String },

    #[error("No route from rank {from} to rank {to}")]
    Unroutable { from: Rank, to: Rank },

    #[error("Rank {rank} left the group")]
    PeerDeparted { rank: Rank },

    #[error("Lost connection to the coordinator")]
    CoordinatorLost,

    #[error("Rank {rank} left the group but was not the designated failing participant")]
    UnexpectedDeparture { rank: Rank },

    #[error("Group protocol error: {message}")]
    ProtocolError { message: String },

    #[error("Failed to launch rank {rank}: {message}")]
    LaunchError { rank: Rank, message: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
