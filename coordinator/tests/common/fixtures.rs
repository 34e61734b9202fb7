//! Constants and canned values for coordinator tests

use std::time::Duration;

pub struct TestFixtures;

impl TestFixtures {
    pub const GROUP_SIZE: u32 = 3;
    pub const SEED: u64 = 42;

    /// Bound on any in-process group run
    pub const RUN_TIMEOUT: Duration = Duration::from_secs(10);

    /// Bound on a launched group of fixture processes
    pub const LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn faulty_fixture() -> &'static str {
        env!("CARGO_BIN_EXE_faulty_parallel_sleep")
    }

    pub fn sleep_fixture() -> &'static str {
        env!("CARGO_BIN_EXE_parallel_sleep")
    }

    pub fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }
}
