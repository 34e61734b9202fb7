//! Service-specific tests
//!
//! Group transport tests run every participant as a task in this process,
//! connected over loopback TCP.

#[cfg(test)]
mod group;

// Common test utilities for services
#[cfg(test)]
pub mod common {
    use std::time::Duration;

    use shared::Rank;
    use tokio::net::TcpListener;

    use crate::services::RealGroupCommunicator;

    /// Standard timeout for group operations in tests
    pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Bring up a complete group on a loopback port, ordered by rank
    pub async fn loopback_group(size: u32) -> Vec<RealGroupCommunicator> {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let coordinator = tokio::spawn(RealGroupCommunicator::accept_members(listener, size, TEST_TIMEOUT));
        let members: Vec<_> = (1..size)
            .map(|rank| tokio::spawn(RealGroupCommunicator::join(addr, Rank(rank), size, TEST_TIMEOUT)))
            .collect();

        let mut group = vec![coordinator.await.unwrap().expect("coordinator bootstrap")];
        for member in members {
            group.push(member.await.unwrap().expect("member bootstrap"));
        }
        group
    }
}
