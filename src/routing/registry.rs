//! Pool of locally registered handlers.
//!
//! # Responsibilities
//! - Store handlers under caller-chosen identities
//! - Resolve bare source descriptors during table builds
//!
//! # Design Decisions
//! - Registration is an upsert; nothing is ever removed
//! - Handlers are stored as `MethodRouter` so every HTTP method reaches them
//! - The registry is only mutated under the router's write lock

use std::collections::HashMap;

use axum::handler::Handler;
use axum::routing::{any, MethodRouter};

/// Named local handlers available to the route builder.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, MethodRouter>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the handler for `identity`.
    ///
    /// Returns `true` when an earlier registration was replaced.
    pub fn insert(&mut self, identity: impl Into<String>, handler: MethodRouter) -> bool {
        self.handlers.insert(identity.into(), handler).is_some()
    }

    /// Register an axum handler for all methods.
    pub fn register<H, T>(&mut self, identity: impl Into<String>, handler: H) -> bool
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.insert(identity, any(handler))
    }

    pub fn get(&self, identity: &str) -> Option<&MethodRouter> {
        self.handlers.get(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.handlers.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut identities: Vec<_> = self.handlers.keys().collect();
        identities.sort();
        f.debug_struct("HandlerRegistry")
            .field("identities", &identities)
            .finish()
    }
}
