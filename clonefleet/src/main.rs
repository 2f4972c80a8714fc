//! Clonefleet CLI: clone or unshallow the repositories listed in the given files.

use clap::Parser;
use clonefleet::cli::{self, Cli};
use clonefleet::observability::init_tracing;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.common.log_format, &cli.common.log_level) {
        eprintln!("clonefleet: {e}");
        return ExitCode::from(2);
    }

    match cli::run(&cli).await {
        Ok(reports) if reports.iter().any(|r| r.has_failures()) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            ExitCode::from(2)
        }
    }
}
