//! The mount router: the piece a host application embeds.
//!
//! ```no_run
//! use fstab_router::{MountOptions, MountRouter};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let router = MountRouter::start(MountOptions::new("./fstab/fstab.json")).await?;
//! router.register("worker", || async { "hello from worker" }).await?;
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router.service()).await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::handler::Handler;
use axum::routing::any;
use axum::Router;
use notify::RecommendedWatcher;
use tokio::sync::{mpsc, watch};
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::schema::{ReloadPolicy, RouterConfig};
use crate::config::watcher::FstabWatcher;
use crate::error::{FstabError, RouterError};
use crate::http::dispatch::dispatch;
use crate::http::proxy::new_client;
use crate::http::request::{UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::scheduler::{
    ReloadOutcome, ReloadScheduler, ReloadState, ReloadTrigger, Reloader,
};
use crate::lifecycle::shutdown::Shutdown;
use crate::routing::builder::RouteBuilder;
use crate::routing::scheme::SchemePolicy;
use crate::routing::table::{MountInfo, MountTable};

/// How a [`MountRouter`] finds and refreshes its mount table.
#[derive(Debug, Clone)]
pub struct MountOptions {
    pub fstab_path: PathBuf,
    /// Zero disables scheduled reloads.
    pub reload_period: Duration,
    pub reload_policy: ReloadPolicy,
    pub watch: bool,
    pub schemes: SchemePolicy,
}

impl MountOptions {
    pub fn new(fstab_path: impl Into<PathBuf>) -> Self {
        Self {
            fstab_path: fstab_path.into(),
            reload_period: Duration::from_secs(10),
            reload_policy: ReloadPolicy::Always,
            watch: false,
            schemes: SchemePolicy::default(),
        }
    }

    pub fn from_config(config: &RouterConfig) -> Self {
        Self {
            fstab_path: PathBuf::from(&config.mounts.fstab_path),
            reload_period: Duration::from_secs(config.mounts.reload_period_secs),
            reload_policy: config.mounts.reload_policy,
            watch: config.mounts.watch,
            schemes: SchemePolicy::new(&config.schemes.proxy),
        }
    }

    pub fn reload_period(mut self, period: Duration) -> Self {
        self.reload_period = period;
        self
    }

    pub fn reload_policy(mut self, policy: ReloadPolicy) -> Self {
        self.reload_policy = policy;
        self
    }

    pub fn watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn schemes(mut self, schemes: SchemePolicy) -> Self {
        self.schemes = schemes;
        self
    }
}

/// Dynamic mount table with its reload machinery.
///
/// Dropping the router stops the scheduler and the file watcher; services
/// handed out by [`MountRouter::service`] keep serving the last table.
pub struct MountRouter {
    reloader: Arc<Reloader>,
    period: watch::Sender<Duration>,
    triggers: mpsc::UnboundedSender<ReloadTrigger>,
    shutdown: Shutdown,
    _watcher: Option<RecommendedWatcher>,
}

impl MountRouter {
    /// Load the mount table, publish it and start the background reloads.
    ///
    /// A mount table that cannot be loaded at startup is logged; the router
    /// then serves only the default root until a reload succeeds.
    pub async fn start(options: MountOptions) -> Result<Self, RouterError> {
        let table = Arc::new(MountTable::default());
        let builder = RouteBuilder::new(options.schemes.clone(), new_client());
        let reloader = Arc::new(Reloader::new(
            options.fstab_path.clone(),
            options.reload_policy,
            builder,
            table,
            options.reload_period,
        ));

        // Failure is logged by the reloader.
        let _ = reloader.reload(ReloadTrigger::Startup).await;

        let (period, period_rx) = watch::channel(options.reload_period);
        let (triggers, trigger_rx) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();

        let watcher = if options.watch {
            Some(FstabWatcher::new(&options.fstab_path, triggers.clone()).run()?)
        } else {
            None
        };

        let scheduler = ReloadScheduler::new(reloader.clone(), period_rx, trigger_rx);
        tokio::spawn(scheduler.run(shutdown.subscribe()));

        Ok(Self {
            reloader,
            period,
            triggers,
            shutdown,
            _watcher: watcher,
        })
    }

    /// Register a local handler under `identity` and reload right away.
    ///
    /// An `Err` means the reload failed; the handler is registered regardless.
    pub async fn register<H, T>(
        &self,
        identity: impl Into<String>,
        handler: H,
    ) -> Result<ReloadOutcome, FstabError>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.reloader.register(identity.into(), any(handler)).await
    }

    /// Change the scheduled reload period. Zero disables scheduled reloads.
    pub fn set_reload_period(&self, period: Duration) {
        self.reloader.set_period(period);
        self.period.send_replace(period);
    }

    /// Reload now, outside the schedule.
    pub async fn reload(&self) -> Result<ReloadOutcome, FstabError> {
        self.reloader.reload(ReloadTrigger::Manual).await
    }

    /// Ask the scheduler to reload without waiting for the result.
    pub fn request_reload(&self) {
        let _ = self.triggers.send(ReloadTrigger::Manual);
    }

    /// Service dispatching against the live table, ready to embed in a server.
    pub fn service(&self) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(self.table())
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    pub fn table(&self) -> Arc<MountTable> {
        self.reloader.table().clone()
    }

    /// Entries of the live mount table and how each was bound.
    pub fn mounts(&self) -> Vec<MountInfo> {
        self.reloader.table().load().entries().to_vec()
    }

    pub fn reload_state(&self) -> Arc<ReloadState> {
        self.reloader.state()
    }

    /// Stop the background reloads.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }
}

impl Drop for MountRouter {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
