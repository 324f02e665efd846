//! HTTP handling subsystem.
//!
//! # Data Flow
//! ```text
//! request (from the host's server)
//!     → request.rs (x-request-id)
//!     → dispatch.rs (snapshot of the live table, route lookup)
//!         → proxy.rs (mounted origin)
//!         → registered handler
//!         → jail.rs, then the root handler (everything unclaimed)
//! ```

pub mod dispatch;
pub mod jail;
pub mod proxy;
pub mod request;

pub use jail::JailRedirect;
pub use proxy::ReverseProxy;
pub use request::{UuidRequestId, X_REQUEST_ID};
