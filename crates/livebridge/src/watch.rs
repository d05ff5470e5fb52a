//! Filesystem watcher that triggers context rebuilds.
//!
//! Watches a directory tree recursively and fires a unit signal
//! whenever a file with the configured suffix is created or modified.
//! The signal channel has capacity one and sends with `try_send`, so a
//! burst of events from a single save collapses into one rebuild.

use std::path::Path;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Errors that can occur when setting up the watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The underlying filesystem watcher could not be created or
    /// pointed at the directory.
    #[error("watcher error: {source}")]
    Notify {
        /// The underlying notify error.
        #[from]
        source: notify::Error,
    },
}

/// A running watcher. Dropping it stops the watch.
#[derive(Debug)]
pub struct ScriptWatcher {
    // Held only to keep the background watcher alive.
    _watcher: RecommendedWatcher,
}

/// Watch `dir` recursively and signal `trigger` whenever a file whose
/// name ends with `suffix` changes.
///
/// # Errors
///
/// Returns [`WatchError`] when the watcher cannot be created or the
/// directory cannot be watched.
pub fn spawn_watcher(
    dir: &Path,
    suffix: &str,
    trigger: mpsc::Sender<()>,
) -> Result<ScriptWatcher, WatchError> {
    let suffix = suffix.to_owned();
    let mut watcher =
        notify::recommended_watcher(move |result: Result<Event, notify::Error>| {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "watch event error");
                    return;
                }
            };
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            let relevant = event
                .paths
                .iter()
                .any(|path| path.to_string_lossy().ends_with(&suffix));
            if relevant {
                // A full channel means a rebuild is already pending;
                // this event coalesces into it.
                let _ = trigger.try_send(());
                debug!("script change detected");
            }
        })?;

    watcher.watch(dir, RecursiveMode::Recursive)?;
    Ok(ScriptWatcher { _watcher: watcher })
}
