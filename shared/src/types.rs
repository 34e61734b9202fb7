//! Core types shared by every fixture binary

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{SharedError, SharedResult};

/// Position of a participant within its group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rank(pub u32);

impl Rank {
    /// The participant that aggregates greetings and broadcasts run parameters
    pub const COORDINATOR: Rank = Rank(0);

    pub fn is_coordinator(&self) -> bool {
        *self == Self::COORDINATOR
    }

    pub fn as_index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Rank {
    fn from(value: u32) -> Self {
        Rank(value)
    }
}

/// Destructive action requested from the fault injector
///
/// The numbering is a stable contract with the external harness:
///
/// | code | action |
/// |------|--------|
/// | 0 | null-page read |
/// | 1 | integer divide by zero |
/// | 2..=11 | SIGFPE, SIGILL, SIGSEGV, SIGBUS, SIGABRT, SIGHUP, SIGINT, SIGQUIT, SIGTERM, SIGKILL |
/// | other | no-op |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum FaultCode {
    NullDereference,
    DivideByZero,
    FloatingPointException,
    IllegalInstruction,
    SegmentationViolation,
    BusError,
    Abort,
    Hangup,
    Interrupt,
    Quit,
    Terminate,
    Kill,
    Unrecognized(i32),
}

impl FaultCode {
    /// Fault used by the multi-process fixture when none is requested
    pub const DEFAULT: FaultCode = FaultCode::DivideByZero;

    /// Every recognized code in table order
    pub const RECOGNIZED: [FaultCode; 12] = [
        FaultCode::NullDereference,
        FaultCode::DivideByZero,
        FaultCode::FloatingPointException,
        FaultCode::IllegalInstruction,
        FaultCode::SegmentationViolation,
        FaultCode::BusError,
        FaultCode::Abort,
        FaultCode::Hangup,
        FaultCode::Interrupt,
        FaultCode::Quit,
        FaultCode::Terminate,
        FaultCode::Kill,
    ];

    pub fn is_recognized(&self) -> bool {
        !matches!(self, FaultCode::Unrecognized(_))
    }

    /// Console line printed before the fault is carried out
    pub fn description(&self) -> &'static str {
        match self {
            FaultCode::NullDereference => "fail type is seg fault",
            FaultCode::DivideByZero => "fail type is divide by zero",
            FaultCode::FloatingPointException => "fail type is SIGFPE",
            FaultCode::IllegalInstruction => "fail type is SIGILL",
            FaultCode::SegmentationViolation => "fail type is SIGSEGV",
            FaultCode::BusError => "fail type is SIGBUS",
            FaultCode::Abort => "fail type is SIGABRT",
            FaultCode::Hangup => "fail type is SIGHUP",
            FaultCode::Interrupt => "fail type is SIGINT",
            FaultCode::Quit => "fail type is SIGQUIT",
            FaultCode::Terminate => "fail type is SIGTERM",
            FaultCode::Kill => "fail type is SIGKILL",
            FaultCode::Unrecognized(_) => "fail type is do nothing",
        }
    }

    /// Human readable table, used in usage messages
    pub fn table() -> String {
        Self::RECOGNIZED
            .iter()
            .map(|code| {
                let label = code.description().trim_start_matches("fail type is ");
                format!("  {}: {}", i32::from(*code), label)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<i32> for FaultCode {
    fn from(code: i32) -> Self {
        match code {
            0 => FaultCode::NullDereference,
            1 => FaultCode::DivideByZero,
            2 => FaultCode::FloatingPointException,
            3 => FaultCode::IllegalInstruction,
            4 => FaultCode::SegmentationViolation,
            5 => FaultCode::BusError,
            6 => FaultCode::Abort,
            7 => FaultCode::Hangup,
            8 => FaultCode::Interrupt,
            9 => FaultCode::Quit,
            10 => FaultCode::Terminate,
            11 => FaultCode::Kill,
            other => FaultCode::Unrecognized(other),
        }
    }
}

impl From<FaultCode> for i32 {
    fn from(code: FaultCode) -> Self {
        match code {
            FaultCode::NullDereference => 0,
            FaultCode::DivideByZero => 1,
            FaultCode::FloatingPointException => 2,
            FaultCode::IllegalInstruction => 3,
            FaultCode::SegmentationViolation => 4,
            FaultCode::BusError => 5,
            FaultCode::Abort => 6,
            FaultCode::Hangup => 7,
            FaultCode::Interrupt => 8,
            FaultCode::Quit => 9,
            FaultCode::Terminate => 10,
            FaultCode::Kill => 11,
            FaultCode::Unrecognized(other) => other,
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i32::from(*self))
    }
}

/// Parameters agreed by the whole group for one coordinated run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParameters {
    pub sleep_seconds: u64,
    pub fault_code: FaultCode,
    pub failing_participant: Rank,
}

impl RunParameters {
    /// Build parameters, rejecting a failing participant outside the group
    pub fn new(
        sleep_seconds: u64,
        fault_code: FaultCode,
        failing_participant: Rank,
        group_size: u32,
    ) -> SharedResult<Self> {
        if failing_participant.0 >= group_size {
            return Err(SharedError::InvalidConfig {
                field: "failing_participant".to_string(),
                value: format!("{failing_participant} (group size {group_size})"),
            });
        }

        Ok(Self {
            sleep_seconds,
            fault_code,
            failing_participant,
        })
    }

    /// Resolve the coordinator's parameters from optional requested values.
    ///
    /// Missing values fall back to a zero sleep and [`FaultCode::DEFAULT`].
    /// The failing participant is always drawn uniformly from the group.
    pub fn resolve<R: Rng + ?Sized>(
        requested_sleep: Option<u64>,
        requested_fault: Option<FaultCode>,
        group_size: u32,
        rng: &mut R,
    ) -> SharedResult<Self> {
        if group_size == 0 {
            return Err(SharedError::InvalidConfig {
                field: "group_size".to_string(),
                value: "0".to_string(),
            });
        }

        let failing_participant = Rank(rng.gen_range(0..group_size));
        Self::new(
            requested_sleep.unwrap_or(0),
            requested_fault.unwrap_or(FaultCode::DEFAULT),
            failing_participant,
            group_size,
        )
    }

    /// Whether the given participant must invoke the fault injector
    pub fn must_fail(&self, rank: Rank) -> bool {
        self.failing_participant == rank
    }
}

impl fmt::Display for RunParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bcast {} {} {}",
            self.sleep_seconds, self.fault_code, self.failing_participant
        )
    }
}

/// Identity of one process taking part in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub rank: Rank,
    pub host: String,
    pub pid: u32,
}

impl ParticipantInfo {
    /// Identity of the calling process
    pub fn current(rank: Rank) -> Self {
        let host = nix::unistd::gethostname()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            rank,
            host,
            pid: std::process::id(),
        }
    }

    /// Line sent to the coordinator at startup
    pub fn greeting(&self) -> String {
        format!("host: {} -- rank {} -- pid {}", self.host, self.rank, self.pid)
    }

    /// Line sent to the coordinator at completion
    pub fn farewell(&self) -> String {
        format!("goodbye from rank {}", self.rank)
    }
}
