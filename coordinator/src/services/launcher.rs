//! Group launcher
//!
//! Starts N copies of a fixture with the group environment, waits for all of
//! them and reports how each rank ended. The optional wall-clock timeout
//! kills the whole group, which is how a harness recovers from a run whose
//! participants are blocked on a peer that will never arrive.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use nix::sys::signal::Signal;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use shared::{rank_info, rank_warn, Rank};

use crate::config::{GroupConfig, DEFAULT_CONNECT_TIMEOUT};
use crate::error::{CoordinatorError, CoordinatorResult};

/// How one launched rank ended
#[derive(Debug, Clone)]
pub struct RankExit {
    pub rank: Rank,
    pub status: ExitStatus,
    /// Captured standard output, when capture was requested
    pub stdout: Option<String>,
    /// Killed by the launcher after the group timeout expired
    pub timed_out: bool,
}

impl RankExit {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Signal that terminated the rank, if any
    pub fn signal(&self) -> Option<Signal> {
        self.status.signal().and_then(|raw| Signal::try_from(raw).ok())
    }

    /// One-line summary, e.g. `rank 2: terminated by signal SIGFPE`
    pub fn describe(&self) -> String {
        let ending = match (self.status.code(), self.status.signal()) {
            (Some(code), _) => format!("exited with code {code}"),
            (None, Some(raw)) => match Signal::try_from(raw) {
                Ok(signal) => format!("terminated by signal {signal}"),
                Err(_) => format!("terminated by signal {raw}"),
            },
            (None, None) => "ended with unknown status".to_string(),
        };

        if self.timed_out {
            format!("rank {}: {} (group timeout)", self.rank, ending)
        } else {
            format!("rank {}: {}", self.rank, ending)
        }
    }
}

/// Launches a fixed-size group of fixture processes
#[derive(Debug, Clone)]
pub struct GroupLauncher {
    size: u32,
    host: IpAddr,
    timeout: Option<Duration>,
    connect_timeout: Duration,
    capture_output: bool,
}

impl GroupLauncher {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            timeout: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            capture_output: false,
        }
    }

    /// Kill the whole group once this much wall-clock time has passed (fluent API)
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Address the coordinator listens on (fluent API)
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Bootstrap timeout handed to every rank (fluent API)
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Capture each rank's stdout instead of inheriting it (fluent API)
    pub fn with_captured_output(mut self, capture_output: bool) -> Self {
        self.capture_output = capture_output;
        self
    }

    /// Run `program` once per rank and wait for every rank to end
    pub async fn run(&self, program: &str, args: &[String]) -> CoordinatorResult<Vec<RankExit>> {
        if self.size == 0 {
            return Err(CoordinatorError::ConfigurationError {
                field: "size".to_string(),
                value: "0".to_string(),
            });
        }

        let coordinator_addr = self.free_address()?;
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        rank_info!(
            Rank::COORDINATOR,
            "🚀 Launching {} rank(s) of {} with coordinator at {}",
            self.size,
            program,
            coordinator_addr
        );

        let mut waiters: Vec<JoinHandle<CoordinatorResult<RankExit>>> = Vec::with_capacity(self.size as usize);
        for rank in (0..self.size).map(Rank) {
            let config = GroupConfig::new(rank, self.size, coordinator_addr)?
                .with_connect_timeout(self.connect_timeout);
            let child = self.spawn_rank(program, args, &config)?;
            waiters.push(tokio::spawn(wait_for_rank(rank, child, deadline)));
        }

        let mut exits = Vec::with_capacity(waiters.len());
        for (rank, waiter) in (0..self.size).map(Rank).zip(waiters) {
            let exit = waiter.await.map_err(|e| CoordinatorError::LaunchError {
                rank,
                message: format!("Waiter task failed: {e}"),
            })??;
            exits.push(exit);
        }

        Ok(exits)
    }

    fn spawn_rank(&self, program: &str, args: &[String], config: &GroupConfig) -> CoordinatorResult<Child> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(config.to_env())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if self.capture_output {
            cmd.stdout(Stdio::piped());
        }

        cmd.spawn().map_err(|e| CoordinatorError::LaunchError {
            rank: config.rank,
            message: format!("Failed to spawn {program}: {e}"),
        })
    }

    /// Ask the OS for a free port on the configured host
    fn free_address(&self) -> CoordinatorResult<SocketAddr> {
        let listener = std::net::TcpListener::bind(SocketAddr::new(self.host, 0))?;
        Ok(listener.local_addr()?)
    }
}

async fn wait_for_rank(rank: Rank, mut child: Child, deadline: Option<Instant>) -> CoordinatorResult<RankExit> {
    let reader = child.stdout.take().map(|mut stdout| {
        tokio::spawn(async move {
            let mut captured = String::new();
            let _ = stdout.read_to_string(&mut captured).await;
            captured
        })
    });

    let mut timed_out = false;
    let status = match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                rank_warn!(rank, "⏰ Group timeout reached, killing rank");
                timed_out = true;
                child.start_kill()?;
                child.wait().await?
            }
        },
        None => child.wait().await?,
    };

    let stdout = match reader {
        Some(reader) => Some(reader.await.map_err(|e| CoordinatorError::LaunchError {
            rank,
            message: format!("Output reader failed: {e}"),
        })?),
        None => None,
    };

    Ok(RankExit {
        rank,
        status,
        stdout,
        timed_out,
    })
}
