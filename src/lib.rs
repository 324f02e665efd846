//! Dynamic mount-table HTTP router.
//!
//! Requests are dispatched across mount points read from a JSON "fstab" file.
//! Each mount is either a reverse-proxied origin or a locally registered
//! handler. The table is rebuilt periodically and swapped atomically under
//! live traffic.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod router;
pub mod routing;

pub use config::RouterConfig;
pub use error::{FstabError, RouterError};
pub use lifecycle::Shutdown;
pub use router::{MountOptions, MountRouter};
