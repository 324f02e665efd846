//! Mount table reloads.
//!
//! # Responsibilities
//! - Run the load → build → swap pipeline
//! - Serialize reloads and registrations behind one write lock
//! - Drive periodic reloads until shutdown
//!
//! # Design Decisions
//! - The new table is built in isolation; a failed load or parse leaves the
//!   live table untouched
//! - Request dispatch never takes the write lock
//! - File I/O runs on the blocking pool
//! - A zero period parks the loop until the period changes or a trigger arrives

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwap;
use axum::routing::MethodRouter;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch, Mutex};

use crate::config::fstab::{load_fstab, source_modified};
use crate::config::schema::ReloadPolicy;
use crate::error::FstabError;
use crate::observability::metrics;
use crate::routing::builder::RouteBuilder;
use crate::routing::registry::HandlerRegistry;
use crate::routing::table::MountTable;

/// Why a reload was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadTrigger {
    Startup,
    Timer,
    FileChanged,
    Registration,
    Manual,
}

impl ReloadTrigger {
    pub fn label(&self) -> &'static str {
        match self {
            ReloadTrigger::Startup => "startup",
            ReloadTrigger::Timer => "timer",
            ReloadTrigger::FileChanged => "file_changed",
            ReloadTrigger::Registration => "registration",
            ReloadTrigger::Manual => "manual",
        }
    }
}

/// Where the reload pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPhase {
    Idle,
    Loading,
    Building,
    Swapped,
}

/// Observable reload bookkeeping.
#[derive(Debug, Clone)]
pub struct ReloadState {
    pub phase: ReloadPhase,
    pub period: Duration,
    pub last_attempt: Option<SystemTime>,
    pub last_success: Option<SystemTime>,
    /// Modification time of the file behind the live table.
    pub source_mod_time: Option<SystemTime>,
    /// Number of tables published so far.
    pub generation: u64,
    pub last_error: Option<String>,
}

impl ReloadState {
    fn new(period: Duration) -> Self {
        Self {
            phase: ReloadPhase::Idle,
            period,
            last_attempt: None,
            last_success: None,
            source_mod_time: None,
            generation: 0,
            last_error: None,
        }
    }
}

/// A successful reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadOutcome {
    pub generation: u64,
    /// Bound mount points in the new table, root included.
    pub mounts: usize,
    pub trigger: ReloadTrigger,
}

/// The load → build → swap pipeline.
pub struct Reloader {
    fstab_path: PathBuf,
    policy: ReloadPolicy,
    builder: RouteBuilder,
    table: Arc<MountTable>,
    registry: Mutex<HandlerRegistry>,
    state: ArcSwap<ReloadState>,
}

impl Reloader {
    pub fn new(
        fstab_path: impl Into<PathBuf>,
        policy: ReloadPolicy,
        builder: RouteBuilder,
        table: Arc<MountTable>,
        period: Duration,
    ) -> Self {
        Self {
            fstab_path: fstab_path.into(),
            policy,
            builder,
            table,
            registry: Mutex::new(HandlerRegistry::new()),
            state: ArcSwap::from_pointee(ReloadState::new(period)),
        }
    }

    pub fn fstab_path(&self) -> &Path {
        &self.fstab_path
    }

    pub fn table(&self) -> &Arc<MountTable> {
        &self.table
    }

    pub fn state(&self) -> Arc<ReloadState> {
        self.state.load_full()
    }

    /// Load, build and publish a new table.
    pub async fn reload(&self, trigger: ReloadTrigger) -> Result<ReloadOutcome, FstabError> {
        let registry = self.registry.lock().await;
        self.reload_locked(&registry, trigger).await
    }

    /// Add or replace a local handler, then reload immediately.
    ///
    /// The handler stays registered even if that reload fails; it becomes
    /// reachable with the next successful one.
    pub async fn register(
        &self,
        identity: String,
        handler: MethodRouter,
    ) -> Result<ReloadOutcome, FstabError> {
        let mut registry = self.registry.lock().await;
        let replaced = registry.insert(identity.clone(), handler);
        tracing::info!(identity = %identity, replaced, "Handler registered");
        self.reload_locked(&registry, ReloadTrigger::Registration).await
    }

    /// Scheduled tick: reload unless the policy says the table is current.
    pub async fn tick(&self) -> Option<Result<ReloadOutcome, FstabError>> {
        if self.policy == ReloadPolicy::OnChange {
            let modified = tokio::fs::metadata(&self.fstab_path)
                .await
                .and_then(|m| m.modified())
                .ok();
            if modified.is_some() && modified == self.state.load().source_mod_time {
                tracing::debug!(path = ?self.fstab_path, "Mount table unchanged, skipping reload");
                return None;
            }
        }
        Some(self.reload(ReloadTrigger::Timer).await)
    }

    pub(crate) fn set_period(&self, period: Duration) {
        self.update(|s| s.period = period);
    }

    async fn reload_locked(
        &self,
        registry: &HandlerRegistry,
        trigger: ReloadTrigger,
    ) -> Result<ReloadOutcome, FstabError> {
        let started = SystemTime::now();
        self.update(|s| {
            s.phase = ReloadPhase::Loading;
            s.last_attempt = Some(started);
        });

        let path = self.fstab_path.clone();
        let loaded = tokio::task::spawn_blocking(move || {
            let modified = source_modified(&path).ok();
            load_fstab(&path).map(|entries| (entries, modified))
        })
        .await
        .unwrap_or_else(|e| {
            Err(FstabError::Io {
                path: self.fstab_path.clone(),
                source: std::io::Error::other(e),
            })
        });

        let (entries, modified) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!(
                    path = ?self.fstab_path,
                    trigger = trigger.label(),
                    error = %e,
                    "Reload failed, keeping current mount table"
                );
                metrics::record_reload(e.kind());
                let message = e.to_string();
                self.update(|s| {
                    s.phase = ReloadPhase::Idle;
                    s.last_error = Some(message.clone());
                });
                return Err(e);
            }
        };

        self.update(|s| s.phase = ReloadPhase::Building);
        let table = self.builder.build(&entries, registry);
        let mounts = table.bound_count();

        self.table.swap(table);
        let finished = SystemTime::now();
        self.update(|s| {
            s.phase = ReloadPhase::Swapped;
            s.generation += 1;
            s.last_success = Some(finished);
            s.source_mod_time = modified;
            s.last_error = None;
        });
        let generation = self.state.load().generation;
        self.update(|s| s.phase = ReloadPhase::Idle);

        metrics::record_reload("ok");
        metrics::set_mounted(mounts);
        tracing::info!(
            generation,
            mounts,
            entries = entries.len(),
            trigger = trigger.label(),
            "Mount table swapped"
        );

        Ok(ReloadOutcome {
            generation,
            mounts,
            trigger,
        })
    }

    fn update(&self, f: impl Fn(&mut ReloadState)) {
        self.state.rcu(|current| {
            let mut next = ReloadState::clone(current);
            f(&mut next);
            next
        });
    }
}

/// Background loop driving periodic and triggered reloads.
pub struct ReloadScheduler {
    reloader: Arc<Reloader>,
    period: watch::Receiver<Duration>,
    triggers: mpsc::UnboundedReceiver<ReloadTrigger>,
}

impl ReloadScheduler {
    pub fn new(
        reloader: Arc<Reloader>,
        period: watch::Receiver<Duration>,
        triggers: mpsc::UnboundedReceiver<ReloadTrigger>,
    ) -> Self {
        Self {
            reloader,
            period,
            triggers,
        }
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            period = ?*self.period.borrow(),
            path = ?self.reloader.fstab_path(),
            "Reload scheduler starting"
        );

        loop {
            let period = *self.period.borrow_and_update();
            tokio::select! {
                _ = wait(period) => {
                    // Failures are logged by the reloader.
                    let _ = self.reloader.tick().await;
                }
                changed = self.period.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    tracing::info!(period = ?*self.period.borrow(), "Reload period changed");
                }
                Some(trigger) = self.triggers.recv() => {
                    let _ = self.reloader.reload(trigger).await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Reload scheduler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

async fn wait(period: Duration) {
    if period.is_zero() {
        std::future::pending::<()>().await;
    } else {
        tokio::time::sleep(period).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::proxy::new_client;
    use crate::routing::scheme::SchemePolicy;
    use crate::routing::table::{Route, RouteTarget};

    struct TempFstab(PathBuf);

    impl TempFstab {
        fn new(content: &str) -> Self {
            let path = std::env::temp_dir().join(format!("fstab-{}.json", uuid::Uuid::new_v4()));
            std::fs::write(&path, content).unwrap();
            Self(path)
        }

        fn write(&self, content: &str) {
            std::fs::write(&self.0, content).unwrap();
        }
    }

    impl Drop for TempFstab {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn reloader(path: &Path, policy: ReloadPolicy) -> Arc<Reloader> {
        Arc::new(Reloader::new(
            path,
            policy,
            RouteBuilder::new(SchemePolicy::default(), new_client()),
            Arc::new(MountTable::default()),
            Duration::ZERO,
        ))
    }

    fn is_proxy(reloader: &Reloader, path: &str) -> bool {
        matches!(
            reloader.table().load().route(path),
            Route::Mount(m) if matches!(m.target, RouteTarget::Proxy(_))
        )
    }

    #[tokio::test]
    async fn test_reload_publishes_table() {
        let file = TempFstab::new(r#"{ "Fstab": { "http://a.example/": "/mnt/a" } }"#);
        let reloader = reloader(&file.0, ReloadPolicy::Always);

        let outcome = reloader.reload(ReloadTrigger::Manual).await.unwrap();
        assert_eq!(outcome.generation, 1);
        assert_eq!(outcome.mounts, 2);
        assert!(is_proxy(&reloader, "/mnt/a/x"));

        let state = reloader.state();
        assert_eq!(state.phase, ReloadPhase::Idle);
        assert!(state.source_mod_time.is_some());
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_live_table() {
        let file = TempFstab::new(r#"{ "Fstab": { "http://a.example/": "/mnt/a" } }"#);
        let reloader = reloader(&file.0, ReloadPolicy::Always);
        reloader.reload(ReloadTrigger::Manual).await.unwrap();
        let before = reloader.table().load();

        file.write("{ broken");
        let err = reloader.reload(ReloadTrigger::Manual).await.unwrap_err();
        assert!(matches!(err, FstabError::Parse { .. }));
        assert!(Arc::ptr_eq(&before, &reloader.table().load()));

        std::fs::remove_file(&file.0).unwrap();
        let err = reloader.reload(ReloadTrigger::Manual).await.unwrap_err();
        assert!(matches!(err, FstabError::Io { .. }));
        assert!(Arc::ptr_eq(&before, &reloader.table().load()));
        assert!(is_proxy(&reloader, "/mnt/a/x"));

        let state = reloader.state();
        assert_eq!(state.generation, 1);
        assert!(state.last_error.is_some());
    }

    #[tokio::test]
    async fn test_register_reloads_immediately() {
        let file = TempFstab::new(r#"{ "Fstab": { "worker": "/mnt/b" } }"#);
        let reloader = reloader(&file.0, ReloadPolicy::Always);
        reloader.reload(ReloadTrigger::Startup).await.unwrap();
        assert!(matches!(reloader.table().load().route("/mnt/b"), Route::Root(_)));

        let outcome = reloader
            .register("worker".into(), axum::routing::any(|| async { "hi" }))
            .await
            .unwrap();
        assert_eq!(outcome.trigger, ReloadTrigger::Registration);
        assert!(matches!(reloader.table().load().route("/mnt/b"), Route::Mount(_)));
    }

    #[tokio::test]
    async fn test_on_change_policy_skips_unchanged_file() {
        let file = TempFstab::new(r#"{ "Fstab": {} }"#);
        let reloader = reloader(&file.0, ReloadPolicy::OnChange);

        assert!(reloader.tick().await.is_some());
        assert!(reloader.tick().await.is_none());
        assert_eq!(reloader.state().generation, 1);
    }

    #[tokio::test]
    async fn test_scheduler_ticks_and_stops() {
        let file = TempFstab::new(r#"{ "Fstab": {} }"#);
        let reloader = reloader(&file.0, ReloadPolicy::Always);
        let (period_tx, period_rx) = watch::channel(Duration::from_millis(20));
        let (_trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(ReloadScheduler::new(reloader.clone(), period_rx, trigger_rx).run(shutdown_rx));

        file.write(r#"{ "Fstab": { "http://a.example/": "/mnt/a" } }"#);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(is_proxy(&reloader, "/mnt/a"));

        // Zero period: no more scheduled reloads.
        period_tx.send_replace(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let generation = reloader.state().generation;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(reloader.state().generation, generation);

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_scheduler_serves_triggers_with_zero_period() {
        let file = TempFstab::new(r#"{ "Fstab": {} }"#);
        let reloader = reloader(&file.0, ReloadPolicy::Always);
        let (_period_tx, period_rx) = watch::channel(Duration::ZERO);
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(ReloadScheduler::new(reloader.clone(), period_rx, trigger_rx).run(shutdown_rx));

        trigger_tx.send(ReloadTrigger::FileChanged).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(reloader.state().generation, 1);

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }
}
