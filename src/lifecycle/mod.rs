//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Reload (scheduler.rs):
//!     timer tick / file change / registration / manual
//!     → Idle → Loading → Building → Swapped → Idle
//!
//! Shutdown (shutdown.rs):
//!     trigger → scheduler exits its loop
//! ```

pub mod scheduler;
pub mod shutdown;

pub use scheduler::{ReloadOutcome, ReloadPhase, ReloadScheduler, ReloadState, ReloadTrigger, Reloader};
pub use shutdown::Shutdown;
