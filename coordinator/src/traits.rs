//! Coordination layer trait

use async_trait::async_trait;
use shared::Rank;

use crate::error::CoordinatorResult;

/// Message-passing primitives shared by a fixed-size participant group
///
/// Barrier, broadcast and receive block until they complete. None of them
/// time out; a participant that disappears is reported instead of awaited.
#[async_trait]
pub trait GroupCommunicator: Send + Sync {
    /// This participant's rank
    fn rank(&self) -> Rank;

    /// Number of participants in the group
    fn size(&self) -> u32;

    /// Wait until every live participant has reached the barrier
    async fn barrier(&self) -> CoordinatorResult<()>;

    /// Distribute `payload` from `root` to every participant, root included.
    /// Non-root participants pass `None` and receive the root's payload.
    async fn broadcast(&self, root: Rank, payload: Option<Vec<u8>>) -> CoordinatorResult<Vec<u8>>;

    /// Blocking point-to-point send
    async fn send(&self, dest: Rank, tag: u32, payload: Vec<u8>) -> CoordinatorResult<()>;

    /// Receive the next message with `tag` from exactly `source`
    async fn recv(&self, source: Rank, tag: u32) -> CoordinatorResult<Vec<u8>>;

    /// Participants observed to have left the group
    async fn departed(&self) -> Vec<Rank>;

    /// Close every connection held by this participant
    async fn finalize(&self) -> CoordinatorResult<()>;
}
