//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Table build (every reload):
//!     MountEntry[] + HandlerRegistry
//!     → scheme.rs (classify source descriptors)
//!     → builder.rs (bind targets, install default root)
//!     → table.rs RouteTable (immutable)
//!     → MountTable::swap
//!
//! Incoming request path
//!     → MountTable::load (snapshot)
//!     → RouteTable::route (longest mount, else root)
//! ```
//!
//! # Design Decisions
//! - Tables are rebuilt from scratch, never patched
//! - No regex in the hot path (segment-aware prefix matching only)
//! - Deterministic: same table and path always give the same route

pub mod builder;
pub mod path;
pub mod registry;
pub mod scheme;
pub mod table;

pub use builder::RouteBuilder;
pub use registry::HandlerRegistry;
pub use scheme::{SchemePolicy, SourceKind};
pub use table::{MountInfo, MountStatus, MountTable, Route, RouteTable, RouteTarget};
