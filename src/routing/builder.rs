//! Route table construction.
//!
//! # Responsibilities
//! - Classify every mount entry by scheme
//! - Bind proxies, registered handlers and not-found responders
//! - Guarantee that `/` is bound exactly once
//!
//! # Design Decisions
//! - The table is built in isolation and only published by the caller
//! - Entries are processed in source order; the first entry for a mount point wins
//! - Problems with single entries are logged, never fatal to the build

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::config::fstab::MountEntry;
use crate::http::jail::JailRedirect;
use crate::http::proxy::{ProxyClient, ReverseProxy};
use crate::routing::path::normalize_mount;
use crate::routing::registry::HandlerRegistry;
use crate::routing::scheme::{SchemePolicy, SourceKind};
use crate::routing::table::{
    Mount, MountInfo, MountStatus, RootHandler, RootRoute, RouteTable, RouteTarget,
};

/// Builds [`RouteTable`]s from mount entries.
#[derive(Clone)]
pub struct RouteBuilder {
    policy: SchemePolicy,
    client: ProxyClient,
}

impl RouteBuilder {
    pub fn new(policy: SchemePolicy, client: ProxyClient) -> Self {
        Self { policy, client }
    }

    pub fn policy(&self) -> &SchemePolicy {
        &self.policy
    }

    /// Build a complete table for `entries`.
    pub fn build(&self, entries: &[MountEntry], registry: &HandlerRegistry) -> RouteTable {
        let entries: Vec<MountEntry> = entries
            .iter()
            .map(|e| MountEntry::new(e.source.clone(), normalize_mount(&e.mount_point)))
            .collect();
        let mut claimed = HashSet::new();
        let mut mounts = Vec::new();
        let mut root_target = None;
        let mut infos = Vec::with_capacity(entries.len());

        for entry in &entries {
            tracing::info!(source = %entry.source, mount = %entry.mount_point, "Mounting");

            if claimed.contains(entry.mount_point.as_str()) {
                tracing::warn!(
                    source = %entry.source,
                    mount = %entry.mount_point,
                    "Mount point already claimed, skipping entry"
                );
                infos.push(info(entry, MountStatus::Shadowed));
                continue;
            }

            let target = match self.resolve(entry, registry) {
                Some(target) => target,
                None => {
                    infos.push(info(entry, MountStatus::Unbound));
                    continue;
                }
            };

            claimed.insert(entry.mount_point.as_str());
            infos.push(info(entry, status_of(&target)));

            if entry.mount_point == "/" {
                root_target = Some(target);
            } else {
                mounts.push(Mount {
                    mount_point: entry.mount_point.clone(),
                    source: entry.source.clone(),
                    target,
                });
            }
        }

        let jail = JailRedirect::new(
            mounts
                .iter()
                .filter(|m| matches!(m.target, RouteTarget::Proxy(_)))
                .map(|m| m.mount_point.clone()),
        );
        let handler = match root_target {
            Some(target) => RootHandler::Target(target),
            None => RootHandler::Listing(listing(&entries)),
        };

        RouteTable::new(mounts, RootRoute { handler, jail }, infos)
    }

    fn resolve(&self, entry: &MountEntry, registry: &HandlerRegistry) -> Option<RouteTarget> {
        match self.policy.classify(&entry.source) {
            SourceKind::Proxy(origin) => Some(RouteTarget::Proxy(ReverseProxy::new(
                origin,
                entry.mount_point.clone(),
                self.client.clone(),
            ))),
            SourceKind::Local(identity) => match registry.get(&identity) {
                Some(handler) => Some(RouteTarget::Handler {
                    identity,
                    handler: handler.clone(),
                }),
                None => {
                    tracing::warn!(identity = %identity, mount = %entry.mount_point, "Resource not found");
                    None
                }
            },
            SourceKind::Unsupported(scheme) => {
                tracing::info!(scheme = %scheme, mount = %entry.mount_point, "Scheme not proxied, serving not found");
                Some(RouteTarget::NotFound)
            }
            SourceKind::Invalid(reason) => {
                tracing::warn!(source = %entry.source, error = %reason, "Unparseable source, serving not found");
                Some(RouteTarget::NotFound)
            }
        }
    }
}

fn info(entry: &MountEntry, status: MountStatus) -> MountInfo {
    MountInfo {
        source: entry.source.clone(),
        mount_point: entry.mount_point.clone(),
        status,
    }
}

fn status_of(target: &RouteTarget) -> MountStatus {
    match target {
        RouteTarget::Proxy(_) => MountStatus::Proxy,
        RouteTarget::Handler { .. } => MountStatus::Handler,
        RouteTarget::NotFound => MountStatus::NotFound,
    }
}

fn listing(entries: &[MountEntry]) -> Arc<str> {
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(out, "{} -> {}", entry.source, entry.mount_point);
    }
    Arc::from(out)
}
