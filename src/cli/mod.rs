//! CLI command handling
//!
//! Dispatches CLI commands and prints the flow report.

use std::path::PathBuf;
use std::sync::Arc;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::Result;
use crate::console;
use crate::engine::HttpEngineFactory;
use crate::flow::{Flow, FlowOptions};
use crate::reload;
use crate::vu::RunContext;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, run: Arc<RunContext>) -> Result<()> {
    match command {
        Commands::Run {
            file,
            reload,
            target,
            timings,
        } => run_flow(file, reload, target, timings, run).await,
    }
}

async fn run_flow(
    file: PathBuf,
    reload_mode: bool,
    target: Option<String>,
    timings: bool,
    run: Arc<RunContext>,
) -> Result<()> {
    let config = Config::load()?;
    let path = std::env::current_dir()?.join(file);

    let options = FlowOptions {
        target: target.or(config.defaults.target),
        show_timings: timings || config.defaults.timings,
        on_error: config.run.on_error,
    };
    let engines = Arc::new(HttpEngineFactory::new(config.http));
    let flow = Flow::new(&path, options, run, engines);

    console::print_banner();

    if reload_mode {
        println!("> Running flow (reload mode on)");
        println!();
        reload::run(&path, Arc::new(flow)).await
    } else {
        println!("> Running flow");
        println!();
        flow.run_once().await?;
        println!();
        Ok(())
    }
}
