//! Tests for the TCP group transport

use std::time::Duration;

use assert_matches::assert_matches;
use shared::{Rank, TEXT_TAG};
use tokio::net::TcpListener;
use tokio::time::timeout;

use super::common::{loopback_group, TEST_TIMEOUT};
use crate::error::CoordinatorError;
use crate::services::RealGroupCommunicator;
use crate::traits::GroupCommunicator;

/// Every participant passes the barrier once all have arrived
#[tokio::test]
async fn test_barrier_releases_whole_group() {
    let group = loopback_group(4).await;
    assert_eq!(group.len(), 4);

    let handles: Vec<_> = group
        .into_iter()
        .map(|comm| tokio::spawn(async move { comm.barrier().await.map(|_| comm) }))
        .collect();

    for handle in handles {
        let result = timeout(TEST_TIMEOUT, handle).await.expect("barrier should complete");
        assert!(result.unwrap().is_ok());
    }
}

/// Nobody leaves the barrier while one participant is still missing
#[tokio::test]
async fn test_barrier_waits_for_late_participant() {
    let mut group = loopback_group(3).await;
    let late = group.pop().unwrap();

    let early: Vec<_> = group
        .into_iter()
        .map(|comm| tokio::spawn(async move { comm.barrier().await.map(|_| comm) }))
        .collect();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(early.iter().all(|handle| !handle.is_finished()), "barrier released early");

    late.barrier().await.unwrap();
    for handle in early {
        timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_broadcast_reaches_every_rank_including_root() {
    let group = loopback_group(3).await;

    let handles: Vec<_> = group
        .into_iter()
        .map(|comm| {
            tokio::spawn(async move {
                let payload = comm.rank().is_coordinator().then(|| b"bcast 2 4 1".to_vec());
                let received = comm.broadcast(Rank::COORDINATOR, payload).await.unwrap();
                (comm.rank(), received)
            })
        })
        .collect();

    for handle in handles {
        let (rank, received) = timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();
        assert_eq!(received, b"bcast 2 4 1", "rank {rank}");
    }
}

#[tokio::test]
async fn test_broadcast_only_from_coordinator() {
    let group = loopback_group(2).await;

    let result = group[0].broadcast(Rank(1), Some(vec![1])).await;
    assert_matches!(result, Err(CoordinatorError::ProtocolError { .. }));

    let result = group[0].broadcast(Rank::COORDINATOR, None).await;
    assert_matches!(result, Err(CoordinatorError::ProtocolError { .. }));
}

/// Messages are taken strictly by source rank, whatever order they were sent in
#[tokio::test]
async fn test_recv_is_strict_by_source() {
    let mut group = loopback_group(3).await;
    let second = group.pop().unwrap();
    let first = group.pop().unwrap();
    let coordinator = group.pop().unwrap();

    second.send(Rank::COORDINATOR, TEXT_TAG, b"from 2".to_vec()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    first.send(Rank::COORDINATOR, TEXT_TAG, b"from 1".to_vec()).await.unwrap();

    assert_eq!(coordinator.recv(Rank(1), TEXT_TAG).await.unwrap(), b"from 1");
    assert_eq!(coordinator.recv(Rank(2), TEXT_TAG).await.unwrap(), b"from 2");
}

/// A message that arrives before a barrier is kept for the later receive
#[tokio::test]
async fn test_early_message_survives_barrier() {
    let mut group = loopback_group(2).await;
    let member = group.pop().unwrap();
    let coordinator = group.pop().unwrap();

    let member_task = tokio::spawn(async move {
        member.send(Rank::COORDINATOR, TEXT_TAG, b"goodbye from rank 1".to_vec()).await?;
        member.barrier().await?;
        Ok::<_, CoordinatorError>(member)
    });

    coordinator.barrier().await.unwrap();
    assert_eq!(coordinator.recv(Rank(1), TEXT_TAG).await.unwrap(), b"goodbye from rank 1");
    timeout(TEST_TIMEOUT, member_task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_tags_are_matched() {
    let mut group = loopback_group(2).await;
    let member = group.pop().unwrap();
    let coordinator = group.pop().unwrap();

    member.send(Rank::COORDINATOR, 7, b"seven".to_vec()).await.unwrap();
    member.send(Rank::COORDINATOR, TEXT_TAG, b"text".to_vec()).await.unwrap();

    assert_eq!(coordinator.recv(Rank(1), TEXT_TAG).await.unwrap(), b"text");
    assert_eq!(coordinator.recv(Rank(1), 7).await.unwrap(), b"seven");
}

#[tokio::test]
async fn test_coordinator_can_reply_to_member() {
    let mut group = loopback_group(2).await;
    let member = group.pop().unwrap();
    let coordinator = group.pop().unwrap();

    coordinator.send(Rank(1), TEXT_TAG, b"ack".to_vec()).await.unwrap();
    assert_eq!(member.recv(Rank::COORDINATOR, TEXT_TAG).await.unwrap(), b"ack");
}

/// A member that goes away is dropped from collectives and reported
#[tokio::test]
async fn test_departed_member_is_reported() {
    let mut group = loopback_group(3).await;
    let gone = group.pop().unwrap();
    drop(gone);

    let member = group.pop().unwrap();
    let coordinator = group.pop().unwrap();

    let member_task = tokio::spawn(async move { member.barrier().await.map(|_| member) });

    timeout(TEST_TIMEOUT, coordinator.barrier()).await.unwrap().unwrap();
    timeout(TEST_TIMEOUT, member_task).await.unwrap().unwrap().unwrap();

    assert_eq!(coordinator.departed().await, vec![Rank(2)]);
    assert_matches!(
        coordinator.recv(Rank(2), TEXT_TAG).await,
        Err(CoordinatorError::PeerDeparted { rank: Rank(2) })
    );
    assert_matches!(
        coordinator.send(Rank(2), TEXT_TAG, vec![]).await,
        Err(CoordinatorError::PeerDeparted { rank: Rank(2) })
    );
}

#[tokio::test]
async fn test_member_notices_lost_coordinator() {
    let mut group = loopback_group(2).await;
    let member = group.pop().unwrap();
    drop(group);

    let result = timeout(TEST_TIMEOUT, member.barrier()).await.unwrap();
    assert_matches!(result, Err(CoordinatorError::CoordinatorLost));
    assert_eq!(member.departed().await, vec![Rank::COORDINATOR]);
}

#[tokio::test]
async fn test_member_routes_only_to_coordinator() {
    let mut group = loopback_group(3).await;
    let member = group.remove(1);

    assert_matches!(
        member.send(Rank(2), TEXT_TAG, vec![]).await,
        Err(CoordinatorError::Unroutable { from: Rank(1), to: Rank(2) })
    );
    assert_matches!(
        member.recv(Rank(2), TEXT_TAG).await,
        Err(CoordinatorError::Unroutable { .. })
    );
    assert_matches!(
        group[0].recv(Rank(9), TEXT_TAG).await,
        Err(CoordinatorError::Unroutable { .. })
    );
}

#[tokio::test]
async fn test_group_of_one() {
    let alone = RealGroupCommunicator::alone();

    assert_eq!(alone.rank(), Rank::COORDINATOR);
    assert_eq!(alone.size(), 1);
    alone.barrier().await.unwrap();
    assert_eq!(alone.broadcast(Rank::COORDINATOR, Some(vec![4, 2])).await.unwrap(), vec![4, 2]);
    assert!(alone.departed().await.is_empty());
    assert_matches!(
        alone.recv(Rank(1), TEXT_TAG).await,
        Err(CoordinatorError::Unroutable { .. })
    );
    alone.finalize().await.unwrap();
}

#[tokio::test]
async fn test_debug_shows_position_in_group() {
    let group = loopback_group(2).await;

    assert_eq!(
        format!("{:?}", group[0]),
        "RealGroupCommunicator { rank: Rank(0), size: 2, role: \"coordinator\" }"
    );
    assert_eq!(
        format!("{:?}", group[1]),
        "RealGroupCommunicator { rank: Rank(1), size: 2, role: \"member\" }"
    );
    assert_eq!(
        format!("{:?}", RealGroupCommunicator::alone()),
        "RealGroupCommunicator { rank: Rank(0), size: 1, role: \"alone\" }"
    );

    let result = RealGroupCommunicator::join("127.0.0.1:9".parse().unwrap(), Rank(5), 2, TEST_TIMEOUT).await;
    assert!(format!("{result:?}").contains("InvalidRank"));
}

#[tokio::test]
async fn test_join_rejects_bad_rank() {
    let addr = "127.0.0.1:9".parse().unwrap();

    assert_matches!(
        RealGroupCommunicator::join(addr, Rank::COORDINATOR, 2, TEST_TIMEOUT).await,
        Err(CoordinatorError::InvalidRank { .. })
    );
    assert_matches!(
        RealGroupCommunicator::join(addr, Rank(2), 2, TEST_TIMEOUT).await,
        Err(CoordinatorError::InvalidRank { .. })
    );
}

#[tokio::test]
async fn test_bootstrap_gives_up_when_members_never_join() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

    let result = RealGroupCommunicator::accept_members(listener, 2, Duration::from_millis(100)).await;
    assert_matches!(result, Err(CoordinatorError::ConnectError { .. }));
}
