//! Multi-process sleep fixture
//!
//! Every rank greets the coordinator, which broadcasts the sleep duration.
//! Run under `grouprun`; the argument is only read by the coordinator.
//!
//! Usage: `parallel_sleep [sleep_seconds]`

use clap::Parser;

use coordinator::{run_parallel_sleep, CoordinatorResult, GroupCommunicator, GroupConfig, RealGroupCommunicator};
use shared::logging;

#[derive(Parser)]
#[command(name = "parallel_sleep")]
#[command(about = "Coordinated sleep across a participant group")]
struct Args {
    /// Seconds to sleep (default 0)
    sleep_seconds: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> CoordinatorResult<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(_) => {
            println!("Bad arguments.  Expecting an optional integer sleep parameter.");
            std::process::exit(1);
        }
    };

    logging::init_tracing("parallel_sleep", Some(&args.log_level));

    let config = GroupConfig::from_env()?;
    logging::log_startup(config.rank, "parallel sleep fixture");

    let comm = RealGroupCommunicator::connect(&config).await?;
    match run_parallel_sleep(&comm, args.sleep_seconds).await {
        Ok(report) => {
            logging::log_shutdown(comm.rank(), &format!("slept {}s", report.sleep_seconds));
            Ok(())
        }
        Err(e) => {
            logging::log_error(comm.rank(), "Coordinated sleep", &e);
            Err(e)
        }
    }
}
