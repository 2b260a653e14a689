//! Filesystem notifications for the flow file
//!
//! The parent directory is watched rather than the file itself, so editors
//! that save by writing a new file and renaming it are still seen.

use std::path::{Path, PathBuf};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::common::{Error, Result};

/// Start watching `path`.
///
/// Returns the watcher, which must be kept alive, and a channel that
/// receives one message per relevant notification. The canonical path of
/// the file is returned alongside.
pub fn watch(path: &Path) -> Result<(RecommendedWatcher, PathBuf, mpsc::Receiver<()>)> {
    let path = path.canonicalize()?;
    let dir = path
        .parent()
        .ok_or_else(|| Error::Config(format!("'{}' has no parent directory", path.display())))?
        .to_path_buf();
    let file_name = path.file_name().map(|n| n.to_os_string());

    // notify calls back on its own thread; forward into the async side
    let (tx, rx) = mpsc::channel::<()>(16);

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                let ours = event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == file_name.as_deref());
                if ours {
                    // A full channel already has a pending wake-up
                    let _ = tx.try_send(());
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "file watcher error");
            }
        }
    })?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    tracing::info!(path = %path.display(), "watching flow file");

    Ok((watcher, path, rx))
}
