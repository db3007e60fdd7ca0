use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use umpv::{Cli, Outcome};

fn init_logging(verbose: bool) {
  let default = if verbose { "warn,umpv=debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  match umpv::run(cli).await {
    Ok(Outcome::Joined { pid }) => {
      log::debug!("Files handed to MPV (pid: {})", pid);
      ExitCode::SUCCESS
    }
    Ok(Outcome::Spawned { pid }) => {
      log::debug!("Started new MPV (pid: {})", pid);
      ExitCode::SUCCESS
    }
    Err(e) => {
      eprintln!("umpv: {}", e);
      ExitCode::FAILURE
    }
  }
}
