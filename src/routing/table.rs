//! Route table and the live, swappable mount table.
//!
//! # Design Decisions
//! - A `RouteTable` is immutable once built
//! - The live table sits behind `ArcSwap`: readers take a snapshot without locking
//! - `swap` is the only mutator and is called from the reload path
//! - Lookup is longest mount first; the root route catches everything else

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::routing::MethodRouter;
use serde::Serialize;

use crate::http::jail::JailRedirect;
use crate::http::proxy::ReverseProxy;
use crate::routing::path::mount_matches;

/// What a mount point dispatches to.
#[derive(Clone)]
pub enum RouteTarget {
    Proxy(ReverseProxy),
    Handler {
        identity: String,
        handler: MethodRouter,
    },
    NotFound,
}

impl RouteTarget {
    /// Metric and log label.
    pub fn label(&self) -> &'static str {
        match self {
            RouteTarget::Proxy(_) => "proxy",
            RouteTarget::Handler { .. } => "handler",
            RouteTarget::NotFound => "not_found",
        }
    }
}

impl std::fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteTarget::Proxy(proxy) => f.debug_tuple("Proxy").field(proxy).finish(),
            RouteTarget::Handler { identity, .. } => {
                f.debug_struct("Handler").field("identity", identity).finish()
            }
            RouteTarget::NotFound => f.write_str("NotFound"),
        }
    }
}

/// A bound mount point.
#[derive(Debug, Clone)]
pub struct Mount {
    pub mount_point: String,
    pub source: String,
    pub target: RouteTarget,
}

/// Handler behind the root route.
#[derive(Debug, Clone)]
pub enum RootHandler {
    /// Plain-text listing of the mount table, served at `/` only.
    Listing(Arc<str>),
    /// An entry of the mount table claimed `/`.
    Target(RouteTarget),
}

/// The root route: always present, always behind the jail.
#[derive(Debug, Clone)]
pub struct RootRoute {
    pub handler: RootHandler,
    pub jail: JailRedirect,
}

/// How one entry of the mount table ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MountStatus {
    Proxy,
    Handler,
    NotFound,
    Unbound,
    Shadowed,
}

/// Summary of one mount table entry, for status pages and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountInfo {
    pub source: String,
    pub mount_point: String,
    pub status: MountStatus,
}

/// Result of a lookup.
#[derive(Debug)]
pub enum Route<'a> {
    Mount(&'a Mount),
    Root(&'a RootRoute),
}

/// A fully built dispatch table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    /// Ordered longest mount point first.
    mounts: Vec<Mount>,
    root: RootRoute,
    entries: Vec<MountInfo>,
}

impl RouteTable {
    /// Assemble a table. Callers must not include `/` in `mounts`.
    pub(crate) fn new(mut mounts: Vec<Mount>, root: RootRoute, entries: Vec<MountInfo>) -> Self {
        mounts.sort_by(|a, b| {
            b.mount_point
                .len()
                .cmp(&a.mount_point.len())
                .then_with(|| a.mount_point.cmp(&b.mount_point))
        });
        Self {
            mounts,
            root,
            entries,
        }
    }

    /// A table with nothing mounted but the default root.
    pub fn empty() -> Self {
        let root = RootRoute {
            handler: RootHandler::Listing(Arc::from("")),
            jail: JailRedirect::default(),
        };
        Self::new(Vec::new(), root, Vec::new())
    }

    /// Find the route serving `path`.
    pub fn route(&self, path: &str) -> Route<'_> {
        self.mounts
            .iter()
            .find(|m| mount_matches(&m.mount_point, path))
            .map(Route::Mount)
            .unwrap_or(Route::Root(&self.root))
    }

    pub fn root(&self) -> &RootRoute {
        &self.root
    }

    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    /// Every entry of the source mount table with its outcome.
    pub fn entries(&self) -> &[MountInfo] {
        &self.entries
    }

    /// Number of bound mount points, the root included.
    pub fn bound_count(&self) -> usize {
        self.mounts.len() + 1
    }
}

/// The live route table.
#[derive(Debug)]
pub struct MountTable {
    live: ArcSwap<RouteTable>,
}

impl MountTable {
    pub fn new(initial: RouteTable) -> Self {
        Self {
            live: ArcSwap::from_pointee(initial),
        }
    }

    /// Snapshot of the current table.
    pub fn load(&self) -> Arc<RouteTable> {
        self.live.load_full()
    }

    /// Publish a new table and return the one it replaced.
    pub fn swap(&self, next: RouteTable) -> Arc<RouteTable> {
        self.live.swap(Arc::new(next))
    }
}

impl Default for MountTable {
    fn default() -> Self {
        Self::new(RouteTable::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount(mount_point: &str) -> Mount {
        Mount {
            mount_point: mount_point.into(),
            source: format!("src{}", mount_point),
            target: RouteTarget::NotFound,
        }
    }

    fn table(points: &[&str]) -> RouteTable {
        let root = RouteTable::empty().root().clone();
        RouteTable::new(points.iter().map(|p| mount(p)).collect(), root, Vec::new())
    }

    fn matched(table: &RouteTable, path: &str) -> Option<String> {
        match table.route(path) {
            Route::Mount(m) => Some(m.mount_point.clone()),
            Route::Root(_) => None,
        }
    }

    #[test]
    fn test_longest_prefix_match() {
        let t = table(&["/mnt", "/mnt/a", "/mnt/a/deep/"]);
        assert_eq!(matched(&t, "/mnt/a/x").as_deref(), Some("/mnt/a"));
        assert_eq!(matched(&t, "/mnt/a/deep/x").as_deref(), Some("/mnt/a/deep/"));
        assert_eq!(matched(&t, "/mnt/b").as_deref(), Some("/mnt"));
        assert_eq!(matched(&t, "/mntx"), None);
        assert_eq!(matched(&t, "/"), None);
    }

    #[test]
    fn test_empty_table_routes_to_root() {
        let t = RouteTable::empty();
        assert!(matches!(t.route("/anything"), Route::Root(_)));
        assert_eq!(t.bound_count(), 1);
    }

    #[test]
    fn test_swap_returns_previous() {
        let live = MountTable::default();
        let before = live.load();
        let previous = live.swap(table(&["/mnt/a"]));

        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(live.load().mounts().len(), 1);
        // The old snapshot is unaffected.
        assert!(before.mounts().is_empty());
    }
}
