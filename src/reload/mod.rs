//! Reload mode
//!
//! Runs a flow once, then again every time its file changes on disk, until
//! the process is stopped.

mod supervisor;
mod watcher;

pub use supervisor::{BusyGuard, Decision, FlowRunner, RunReason, Supervisor, WatchState};
pub use watcher::watch;

use std::path::Path;
use std::sync::Arc;

use crate::common::Result;

/// Watch `path` and keep rerunning `runner` until Ctrl-C.
pub async fn run<R: FlowRunner>(path: &Path, runner: Arc<R>) -> Result<()> {
    let (_watcher, path, changes) = watch(path)?;
    let supervisor = Supervisor::new(path, runner);

    tokio::select! {
        result = supervisor.supervise(changes) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, stopping reload mode");
            Ok(())
        }
    }
}
