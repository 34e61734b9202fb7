//! Helpers that bring up loopback groups and run whole schedules in-process
//!
//! Every participant runs as a tokio task with its own connection, so a
//! participant that returns early drops its connection exactly like a
//! process that died.

use mockall::predicate::eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::net::TcpListener;

use coordinator::{
    run_faulty_parallel_sleep, CoordinatorResult, GroupCommunicator, RealGroupCommunicator, RunReport,
};
use injector::{FaultOutcome, MockFaultInjector};
use shared::{FaultCode, Rank};

use super::fixtures::TestFixtures;

pub struct TestHelpers;

impl TestHelpers {
    /// Bring up a complete group on a loopback port, ordered by rank
    pub async fn loopback_group(size: u32) -> Vec<RealGroupCommunicator> {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let coordinator = tokio::spawn(RealGroupCommunicator::accept_members(
            listener,
            size,
            TestFixtures::RUN_TIMEOUT,
        ));
        let members: Vec<_> = (1..size)
            .map(|rank| {
                tokio::spawn(RealGroupCommunicator::join(
                    addr,
                    Rank(rank),
                    size,
                    TestFixtures::RUN_TIMEOUT,
                ))
            })
            .collect();

        let mut group = vec![coordinator.await.unwrap().expect("coordinator bootstrap")];
        for member in members {
            group.push(member.await.unwrap().expect("member bootstrap"));
        }
        group
    }

    /// Rank the coordinator will pick when seeded with `seed`
    pub fn expected_failing_rank(seed: u64, size: u32) -> Rank {
        Rank(StdRng::seed_from_u64(seed).gen_range(0..size))
    }

    /// First seed that makes the coordinator pick `rank`
    pub fn seed_selecting(rank: Rank, size: u32) -> u64 {
        (0..)
            .find(|seed| Self::expected_failing_rank(*seed, size) == rank)
            .unwrap()
    }

    /// Injector for one participant: the failing one must be asked exactly
    /// once for `code` and answers `outcome`, everybody else never.
    pub fn injector_for(
        rank: Rank,
        failing: Rank,
        code: FaultCode,
        outcome: FaultOutcome,
    ) -> MockFaultInjector {
        let mut injector = MockFaultInjector::new();
        if rank == failing {
            injector
                .expect_inject()
                .with(eq(code))
                .times(1)
                .returning(move |_| outcome);
        } else {
            injector.expect_inject().times(0);
        }
        injector
    }

    /// Run the faulty schedule on every rank of a fresh loopback group.
    /// Results come back ordered by rank.
    pub async fn run_faulty_group(
        size: u32,
        seed: u64,
        sleep: Option<u64>,
        fault: Option<FaultCode>,
        failing_outcome: FaultOutcome,
    ) -> Vec<CoordinatorResult<RunReport>> {
        let failing = Self::expected_failing_rank(seed, size);
        let code = fault.unwrap_or(FaultCode::DEFAULT);

        let handles: Vec<_> = Self::loopback_group(size)
            .await
            .into_iter()
            .map(|comm| {
                let injector = Self::injector_for(comm.rank(), failing, code, failing_outcome);
                tokio::spawn(async move {
                    let mut rng = StdRng::seed_from_u64(seed);
                    run_faulty_parallel_sleep(&comm, sleep, fault, &injector, &mut rng).await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = tokio::time::timeout(TestFixtures::RUN_TIMEOUT, handle)
                .await
                .expect("participant should not hang");
            results.push(result.unwrap());
        }
        results
    }
}
