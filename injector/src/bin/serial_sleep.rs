//! Sleep for the given number of seconds and exit
//!
//! Usage: `serial_sleep <sleep_seconds> [ignored..]`

use clap::Parser;

use injector::{serial, InjectorResult};
use shared::{logging, Rank};

#[derive(Parser)]
#[command(name = "serial_sleep")]
#[command(about = "Sleeps for the given number of seconds")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Seconds to sleep; only the leading integer of the first value is read
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "SLEEP_SECONDS")]
    values: Vec<String>,
}

const MISSING_ARGUMENT: &str =
    "No argument given.  Please provide an integer value for which the program will sleep.";

#[tokio::main]
async fn main() -> InjectorResult<()> {
    let args = Args::parse();

    let Some(first) = args.values.first() else {
        println!("{MISSING_ARGUMENT}");
        std::process::exit(1);
    };
    let sleep_seconds = serial::sleep_seconds_from(first);

    logging::init_tracing("serial_sleep", Some(&args.log_level));
    logging::log_startup(Rank::COORDINATOR, "serial sleep fixture");
    serial::serial_sleep(sleep_seconds).await;
    logging::log_shutdown(Rank::COORDINATOR, "fixture completed");
    Ok(())
}
