//! Multi-process fault fixture
//!
//! Every rank greets the coordinator, the coordinator picks a random rank to
//! fail, and after the agreed sleep that rank injects the agreed fault. Run
//! under `grouprun`; arguments are only read by the coordinator.
//!
//! Usage: `faulty_parallel_sleep [sleep_seconds] [fault_code]`

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use coordinator::{run_faulty_parallel_sleep, CoordinatorResult, GroupCommunicator, GroupConfig, RealGroupCommunicator};
use injector::ProcessFaultInjector;
use shared::{logging, rank_debug, FaultCode};

#[derive(Parser)]
#[command(name = "faulty_parallel_sleep")]
#[command(about = "Coordinated sleep in which one random participant fails")]
struct Args {
    /// Seconds to sleep before and after the fault (default 0)
    sleep_seconds: Option<u64>,

    /// Fault code (default 1, divide by zero)
    #[arg(allow_negative_numbers = true)]
    fault_code: Option<i32>,

    /// Seed for choosing the failing participant (default: current time)
    #[arg(long, env = "FIXTURE_SEED")]
    seed: Option<u64>,

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
            println!(
                "Bad arguments.  Expecting optional sleep parameter and failure type.\n{}\n",
                FaultCode::table()
            );
            std::process::exit(1);
        }
    };

    logging::init_tracing("faulty_parallel_sleep", Some(&args.log_level));

    let config = GroupConfig::from_env()?;
    logging::log_startup(config.rank, "faulty parallel sleep fixture");

    let comm = RealGroupCommunicator::connect(&config).await?;

    let seed = args
        .seed
        .unwrap_or_else(|| chrono::Utc::now().timestamp() as u64);
    rank_debug!(comm.rank(), "Failing participant seed: {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let injector = ProcessFaultInjector::new();
    let result = run_faulty_parallel_sleep(
        &comm,
        args.sleep_seconds,
        args.fault_code.map(FaultCode::from),
        &injector,
        &mut rng,
    )
    .await;

    match result {
        Ok(report) => {
            logging::log_shutdown(comm.rank(), &format!("{:?}", report.outcome));
            Ok(())
        }
        Err(e) => {
            logging::log_error(comm.rank(), "Coordinated run", &e);
            Err(e)
        }
    }
}
