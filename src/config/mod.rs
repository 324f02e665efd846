//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! router settings (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (read once at startup)
//!
//! mount table (JSON)
//!     → fstab.rs (parse into MountEntry list), on every reload
//!     → watcher.rs nudges the reload scheduler when the file changes
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once loaded; the mount table is the hot part
//! - All settings fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod fstab;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use fstab::MountEntry;
pub use schema::ListenerConfig;
pub use schema::MountsConfig;
pub use schema::ReloadPolicy;
pub use schema::RouterConfig;
