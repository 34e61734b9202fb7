//! Service implementations for the coordination layer

pub mod group;
pub mod launcher;

#[cfg(test)]
mod tests;

pub use group::RealGroupCommunicator;
pub use launcher::{GroupLauncher, RankExit};
