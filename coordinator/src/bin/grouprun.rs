//! Launch a fixture as a participant group
//!
//! Usage: `grouprun -n <size> [--timeout-secs S] -- <program> [args..]`

use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;

use coordinator::{CoordinatorResult, GroupLauncher};
use shared::logging;

#[derive(Parser)]
#[command(name = "grouprun")]
#[command(about = "Runs a fixture once per rank of a participant group")]
struct Args {
    /// Number of participants
    #[arg(short = 'n', long, default_value = "1")]
    size: u32,

    /// Kill the whole group after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Address the coordinator listens on
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Fixture program followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> CoordinatorResult<()> {
    let args = Args::parse();
    logging::init_tracing("grouprun", Some(&args.log_level));

    let Some((program, program_args)) = args.command.split_first() else {
        eprintln!("No fixture program given");
        std::process::exit(1);
    };

    let exits = GroupLauncher::new(args.size)
        .with_host(args.host)
        .with_timeout(args.timeout_secs.map(Duration::from_secs))
        .run(program, program_args)
        .await?;

    for exit in &exits {
        println!("{}", exit.describe());
    }

    if exits.iter().all(|exit| exit.success()) {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
