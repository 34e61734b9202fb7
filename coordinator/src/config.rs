//! Group bootstrap configuration
//!
//! The launcher hands every participant its rank, the group size and the
//! coordinator address through environment variables. A process started
//! without them forms a group of one.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use shared::Rank;

use crate::error::{CoordinatorError, CoordinatorResult};

pub const RANK_ENV: &str = "FIXTURE_GROUP_RANK";
pub const SIZE_ENV: &str = "FIXTURE_GROUP_SIZE";
pub const ADDR_ENV: &str = "FIXTURE_GROUP_ADDR";
pub const CONNECT_TIMEOUT_ENV: &str = "FIXTURE_CONNECT_TIMEOUT_MS";

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where this process sits in its group and how to reach the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupConfig {
    pub rank: Rank,
    pub size: u32,
    pub coordinator_addr: SocketAddr,
    /// Bound on group bootstrap only; collectives never time out
    pub connect_timeout: Duration,
}

impl GroupConfig {
    /// A group of one: the process is coordinator and sole participant
    pub fn singleton() -> Self {
        Self {
            rank: Rank::COORDINATOR,
            size: 1,
            coordinator_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn new(rank: Rank, size: u32, coordinator_addr: SocketAddr) -> CoordinatorResult<Self> {
        if size == 0 {
            return Err(CoordinatorError::ConfigurationError {
                field: SIZE_ENV.to_string(),
                value: "0".to_string(),
            });
        }
        if rank.0 >= size {
            return Err(CoordinatorError::InvalidRank { rank, size });
        }

        Ok(Self {
            rank,
            size,
            coordinator_addr,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    /// Configure bootstrap timeout (fluent API)
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Read the configuration from the process environment
    pub fn from_env() -> CoordinatorResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> CoordinatorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rank = lookup(RANK_ENV);
        let size = lookup(SIZE_ENV);
        let addr = lookup(ADDR_ENV);

        let mut config = match (rank, size, addr) {
            (None, None, None) => Self::singleton(),
            (Some(rank), Some(size), Some(addr)) => Self::new(
                Rank(parse_var(RANK_ENV, &rank)?),
                parse_var(SIZE_ENV, &size)?,
                parse_var(ADDR_ENV, &addr)?,
            )?,
            _ => {
                return Err(CoordinatorError::ConfigurationError {
                    field: format!("{RANK_ENV}/{SIZE_ENV}/{ADDR_ENV}"),
                    value: "must be set together".to_string(),
                })
            }
        };

        if let Some(millis) = lookup(CONNECT_TIMEOUT_ENV) {
            config.connect_timeout = Duration::from_millis(parse_var(CONNECT_TIMEOUT_ENV, &millis)?);
        }

        Ok(config)
    }

    /// Environment a launched participant needs to find its group
    pub fn to_env(&self) -> Vec<(&'static str, String)> {
        vec![
            (RANK_ENV, self.rank.to_string()),
            (SIZE_ENV, self.size.to_string()),
            (ADDR_ENV, self.coordinator_addr.to_string()),
            (CONNECT_TIMEOUT_ENV, self.connect_timeout.as_millis().to_string()),
        ]
    }
}

fn parse_var<T: std::str::FromStr>(field: &str, value: &str) -> CoordinatorResult<T> {
    value.trim().parse().map_err(|_| CoordinatorError::ConfigurationError {
        field: field.to_string(),
        value: value.to_string(),
    })
}
