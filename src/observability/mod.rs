//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Listener, dialer and sessions produce:
//!     → events.rs (lifecycle events: listen, accept, connect, close)
//!         → tracing (structured log lines, logging.rs)
//!         → metrics facade (counters, gauges, histograms, metrics.rs)
//!
//! Consumers:
//!     → stdout (pretty, compact or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Session ID flows through every session event
//! - Logging and metrics never fail the caller

pub mod events;
pub mod logging;
pub mod metrics;
