//! Participant schedules for the multi-process fixtures
//!
//! Both fixtures share the same opening: rendezvous, greetings to the
//! coordinator, rendezvous again, then a broadcast of the run parameters.
//! The faulty variant adds the fault step and the farewell exchange.

use std::time::Duration;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;

use injector::{FaultInjector, FaultOutcome};
use shared::{rank_debug, rank_info, rank_warn, FaultCode, ParticipantInfo, Rank, RunParameters, TEXT_TAG};

use crate::error::{CoordinatorError, CoordinatorResult};
use crate::traits::GroupCommunicator;

/// How a participant's run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantOutcome {
    /// Reached teardown after the farewell exchange
    Completed,
    /// Was the failing participant and did not survive the fault
    Terminated,
    /// The coordinator was the failing participant and went away; no farewell possible
    CoordinatorLost,
}

/// Result of one faulty run, as seen by one participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub rank: Rank,
    pub parameters: RunParameters,
    /// Greeting lines printed by the coordinator, its own first. Empty elsewhere.
    pub greetings: Vec<String>,
    /// Farewell lines printed by the coordinator, its own first. Empty elsewhere.
    pub farewells: Vec<String>,
    pub outcome: ParticipantOutcome,
}

/// Result of one plain sleep run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SleepReport {
    pub rank: Rank,
    pub sleep_seconds: u64,
    pub greetings: Vec<String>,
}

/// Plain multi-process sleep: agree on a duration, then everybody sleeps it
pub async fn run_parallel_sleep<C>(comm: &C, requested_sleep: Option<u64>) -> CoordinatorResult<SleepReport>
where
    C: GroupCommunicator + ?Sized,
{
    let me = ParticipantInfo::current(comm.rank());

    comm.barrier().await?;
    let greetings = exchange_greetings(comm, &me).await?;

    if me.rank.is_coordinator() {
        println!("post-hello world barrier");
    }
    comm.barrier().await?;

    let sleep_seconds = if me.rank.is_coordinator() {
        println!("get sleep_val");
        let sleep_seconds = requested_sleep.unwrap_or(0);
        println!("bcast");
        let shared = broadcast_value(comm, Some(&sleep_seconds)).await?;
        println!("{} is sleeping for {} seconds", me.rank, shared);
        shared
    } else {
        broadcast_value::<C, u64>(comm, None).await?
    };

    sleep_for(sleep_seconds).await;
    comm.finalize().await?;

    Ok(SleepReport {
        rank: me.rank,
        sleep_seconds,
        greetings,
    })
}

/// Multi-process fault run: one participant, chosen by the coordinator with
/// `rng`, hands the agreed fault code to `injector`; the rest observe.
pub async fn run_faulty_parallel_sleep<C, I, R>(
    comm: &C,
    requested_sleep: Option<u64>,
    requested_fault: Option<FaultCode>,
    injector: &I,
    rng: &mut R,
) -> CoordinatorResult<RunReport>
where
    C: GroupCommunicator + ?Sized,
    I: FaultInjector + ?Sized,
    R: Rng + ?Sized,
{
    let me = ParticipantInfo::current(comm.rank());

    comm.barrier().await?;
    let greetings = exchange_greetings(comm, &me).await?;
    comm.barrier().await?;

    let parameters = if me.rank.is_coordinator() {
        let resolved = RunParameters::resolve(requested_sleep, requested_fault, comm.size(), rng)?;
        println!("{resolved}");
        broadcast_value(comm, Some(&resolved)).await?
    } else {
        broadcast_value::<C, RunParameters>(comm, None).await?
    };
    rank_debug!(me.rank, "Received run parameters: {:?}", parameters);

    let mut report = RunReport {
        rank: me.rank,
        parameters,
        greetings,
        farewells: Vec::new(),
        outcome: ParticipantOutcome::Completed,
    };

    sleep_for(parameters.sleep_seconds).await;

    if parameters.must_fail(me.rank) {
        rank_warn!(me.rank, "💉 Selected to fail with code {}", parameters.fault_code);
        if injector.inject(parameters.fault_code) == FaultOutcome::Terminated {
            report.outcome = ParticipantOutcome::Terminated;
            return Ok(report);
        }
    }

    sleep_for(parameters.sleep_seconds).await;

    match comm.barrier().await {
        Err(CoordinatorError::CoordinatorLost) if parameters.failing_participant.is_coordinator() => {
            rank_warn!(me.rank, "⚠️ Coordinator did not survive its fault, skipping farewell");
            report.outcome = ParticipantOutcome::CoordinatorLost;
            return Ok(report);
        }
        result => result?,
    }

    if me.rank.is_coordinator() {
        report.farewells = collect_farewells(comm, &me, &parameters).await?;
    } else {
        comm.send(Rank::COORDINATOR, TEXT_TAG, me.farewell().into_bytes()).await?;
    }

    comm.finalize().await?;
    rank_info!(me.rank, "✅ Run completed");
    Ok(report)
}

/// Members send their greeting; the coordinator prints its own and then
/// receives one per member in rank order.
async fn exchange_greetings<C>(comm: &C, me: &ParticipantInfo) -> CoordinatorResult<Vec<String>>
where
    C: GroupCommunicator + ?Sized,
{
    if !me.rank.is_coordinator() {
        comm.send(Rank::COORDINATOR, TEXT_TAG, me.greeting().into_bytes()).await?;
        return Ok(Vec::new());
    }

    let own = me.greeting();
    println!("{own}");
    let mut greetings = vec![own];

    for source in 1..comm.size() {
        let line = recv_text(comm, Rank(source)).await?;
        println!("{line}");
        greetings.push(line);
    }

    Ok(greetings)
}

/// Coordinator side of the farewell exchange. Only the designated failing
/// participant may be missing.
async fn collect_farewells<C>(
    comm: &C,
    me: &ParticipantInfo,
    parameters: &RunParameters,
) -> CoordinatorResult<Vec<String>>
where
    C: GroupCommunicator + ?Sized,
{
    let departed = comm.departed().await;
    if let Some(rank) = departed
        .iter()
        .copied()
        .find(|rank| *rank != parameters.failing_participant)
    {
        return Err(CoordinatorError::UnexpectedDeparture { rank });
    }

    let own = me.farewell();
    println!("{own}");
    let mut farewells = vec![own];

    for source in (1..comm.size()).map(Rank) {
        if departed.contains(&source) {
            rank_info!(me.rank, "💀 Rank {} did not survive fault {}", source, parameters.fault_code);
            continue;
        }

        match recv_text(comm, source).await {
            Ok(line) => {
                println!("{line}");
                farewells.push(line);
            }
            Err(CoordinatorError::PeerDeparted { rank }) if rank == parameters.failing_participant => {
                rank_info!(me.rank, "💀 Rank {} did not survive fault {}", rank, parameters.fault_code);
            }
            Err(CoordinatorError::PeerDeparted { rank }) => {
                return Err(CoordinatorError::UnexpectedDeparture { rank });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(farewells)
}

async fn recv_text<C>(comm: &C, source: Rank) -> CoordinatorResult<String>
where
    C: GroupCommunicator + ?Sized,
{
    let bytes = comm.recv(source, TEXT_TAG).await?;
    String::from_utf8(bytes).map_err(|e| CoordinatorError::ProtocolError {
        message: format!("Rank {source} sent a non UTF-8 line: {e}"),
    })
}

/// Broadcast a serializable value from the coordinator to every participant
pub async fn broadcast_value<C, T>(comm: &C, value: Option<&T>) -> CoordinatorResult<T>
where
    C: GroupCommunicator + ?Sized,
    T: Serialize + DeserializeOwned,
{
    let payload = value
        .map(|value| bincode::serialize(value))
        .transpose()
        .map_err(|e| CoordinatorError::ProtocolError {
            message: format!("Failed to serialize broadcast value: {e}"),
        })?;

    let received = comm.broadcast(Rank::COORDINATOR, payload).await?;

    bincode::deserialize(&received).map_err(|e| CoordinatorError::ProtocolError {
        message: format!("Failed to deserialize broadcast value: {e}"),
    })
}

async fn sleep_for(seconds: u64) {
    tokio::time::sleep(Duration::from_secs(seconds)).await;
}
