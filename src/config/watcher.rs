//! Mount table file watcher for hot reload.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::lifecycle::scheduler::ReloadTrigger;

/// Watches the mount table file and asks the scheduler to reload on change.
///
/// The parent directory is watched rather than the file itself so that
/// editors which replace the file by rename are still noticed.
pub struct FstabWatcher {
    path: PathBuf,
    trigger_tx: mpsc::UnboundedSender<ReloadTrigger>,
}

impl FstabWatcher {
    pub fn new(path: &Path, trigger_tx: mpsc::UnboundedSender<ReloadTrigger>) -> Self {
        Self {
            path: path.to_path_buf(),
            trigger_tx,
        }
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.trigger_tx;
        let file_name: Option<OsString> = self.path.file_name().map(|n| n.to_os_string());
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if touches_file(&event, file_name.as_deref()) {
                        tracing::info!("Mount table change detected, reloading");
                        let _ = tx.send(ReloadTrigger::FileChanged);
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Mount table watcher started");
        Ok(watcher)
    }
}

/// Whether `event` writes or creates the file called `file_name`.
fn touches_file(event: &Event, file_name: Option<&OsStr>) -> bool {
    let relevant = event.kind.is_modify() || event.kind.is_create();
    relevant && event.paths.iter().any(|p| p.file_name() == file_name)
}
