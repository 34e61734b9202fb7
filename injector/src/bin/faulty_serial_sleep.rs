//! Sleep for the given number of seconds, then inject the given fault
//!
//! Usage: `faulty_serial_sleep <sleep_seconds> <fault_code>`
//!
//! Both values are read like C `atoi`, so a non-numeric value counts as 0.

use clap::Parser;

use injector::{serial, InjectorResult, ProcessFaultInjector};
use shared::{logging, FaultCode, Rank};

#[derive(Parser)]
#[command(name = "faulty_serial_sleep")]
#[command(about = "Sleeps, then triggers the requested failure")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Seconds to sleep, then the fault code (see table)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "SLEEP_SECONDS FAULT_CODE")]
    values: Vec<String>,
}

fn bad_arguments() -> ! {
    println!(
        "Bad arguments.  Expecting sleep parameter and a failure type.\n{}\n",
        FaultCode::table()
    );
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> InjectorResult<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(_) => bad_arguments(),
    };

    let [sleep, code] = args.values.as_slice() else {
        bad_arguments();
    };
    let sleep_seconds = serial::sleep_seconds_from(sleep);
    let fault_code = FaultCode::from(serial::leading_integer(code));

    logging::init_tracing("faulty_serial_sleep", Some(&args.log_level));
    logging::log_startup(Rank::COORDINATOR, "faulty serial sleep fixture");

    let injector = ProcessFaultInjector::new();
    serial::faulty_serial_sleep(sleep_seconds, fault_code, &injector).await;

    logging::log_shutdown(Rank::COORDINATOR, "fixture completed");
    Ok(())
}
