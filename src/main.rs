//! skytrace - run a single HTTP user flow against a live target
//!
//! Executes a YAML flow once, printing expectation results as each
//! response arrives, or keeps rerunning it on every save in reload mode.

use std::sync::Arc;

use clap::Parser;
use skytrace::commands::Commands;
use skytrace::common::logging;
use skytrace::{cli, RunContext};

#[derive(Parser)]
#[command(name = "skytrace", about = "Run HTTP flows against a live target")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    logging::init_cli();

    let cli = Cli::parse();
    let run = Arc::new(RunContext::new());

    if let Err(e) = cli::dispatch(cli.command, run).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
