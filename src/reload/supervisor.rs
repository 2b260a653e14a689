//! Reload supervisor
//!
//! Debounces change notifications by modification time and guarantees that
//! at most one run is in flight. Notifications that arrive while a run is in
//! progress are dropped, not queued.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::common::Result;

/// Why a run was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunReason {
    /// The first run, before any change
    Initial,
    /// The watched file changed
    Changed,
}

/// Something the supervisor can run end-to-end
#[async_trait]
pub trait FlowRunner: Send + Sync + 'static {
    async fn run(&self, reason: RunReason) -> Result<()>;
}

/// What the supervisor did with a change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A rerun was started
    Rerun,
    /// Same modification time as the last rerun
    Duplicate,
    /// A run is already in progress
    Busy,
}

/// Clears the busy flag when the run holding it ends
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Reload bookkeeping: last seen mtime and the re-entrancy flag
#[derive(Debug, Default)]
pub struct WatchState {
    last_mtime: Option<SystemTime>,
    busy: Arc<AtomicBool>,
}

impl WatchState {
    /// Try to take the busy flag
    pub fn acquire(&self) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard(self.busy.clone()))
    }

    /// Classify a change with the given modification time.
    ///
    /// On `Ok` the mtime is recorded and the caller owns the busy flag until
    /// the guard is dropped.
    pub fn observe(&mut self, mtime: SystemTime) -> std::result::Result<BusyGuard, Decision> {
        if self.last_mtime == Some(mtime) {
            return Err(Decision::Duplicate);
        }
        let guard = self.acquire().ok_or(Decision::Busy)?;
        self.last_mtime = Some(mtime);
        Ok(guard)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// Drives reruns of a flow in response to file changes
pub struct Supervisor<R: FlowRunner> {
    path: PathBuf,
    state: WatchState,
    runner: Arc<R>,
    running: Option<JoinHandle<()>>,
}

impl<R: FlowRunner> Supervisor<R> {
    pub fn new(path: impl Into<PathBuf>, runner: Arc<R>) -> Self {
        Self {
            path: path.into(),
            state: WatchState::default(),
            runner,
            running: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Start the initial run, independent of any change
    pub fn start(&mut self) -> Decision {
        match self.state.acquire() {
            Some(guard) => {
                self.spawn(guard, RunReason::Initial);
                Decision::Rerun
            }
            None => Decision::Busy,
        }
    }

    /// Handle one change notification
    pub fn on_change(&mut self, mtime: SystemTime) -> Decision {
        match self.state.observe(mtime) {
            Ok(guard) => {
                tracing::info!(path = %self.path.display(), "flow file changed, rerunning");
                self.spawn(guard, RunReason::Changed);
                Decision::Rerun
            }
            Err(decision) => {
                tracing::debug!(?decision, "change notification dropped");
                decision
            }
        }
    }

    /// Wait for the in-flight run, if any
    pub async fn wait(&mut self) {
        if let Some(handle) = self.running.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "flow run task panicked");
            }
        }
    }

    /// Run once, then rerun on every change until the notification channel
    /// closes.
    ///
    /// Failing to stat the watched file is returned to the caller.
    pub async fn supervise(mut self, mut changes: mpsc::Receiver<()>) -> Result<()> {
        self.start();

        while changes.recv().await.is_some() {
            let mtime = tokio::fs::metadata(&self.path).await?.modified()?;
            self.on_change(mtime);
        }

        self.wait().await;
        Ok(())
    }

    fn spawn(&mut self, guard: BusyGuard, reason: RunReason) {
        let runner = self.runner.clone();
        self.running = Some(tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = runner.run(reason).await {
                tracing::warn!(error = %e, ?reason, "flow run did not complete");
            }
        }));
    }
}
