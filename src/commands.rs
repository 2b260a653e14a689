//! CLI command definitions
//!
//! Defines the clap commands for the skytrace CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a flow
    #[command(alias = "test")]
    Run {
        /// Path to the flow file
        file: PathBuf,

        /// Reload and rerun the flow automatically when the file changes
        #[arg(long, short)]
        reload: bool,

        /// Target endpoint, e.g. https://api.example-pet-store.com
        #[arg(long, short)]
        target: Option<String>,

        /// Show HTTP timing information for each request
        #[arg(long)]
        timings: bool,
    },
}
