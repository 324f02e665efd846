//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatch / reload path
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//! HTTP layer
//!     → tower_http TraceLayer spans carrying x-request-id
//! ```

pub mod logging;
pub mod metrics;
