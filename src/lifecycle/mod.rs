//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Build dialer → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Accept loop stops → Process exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then dialer, then listener
//! - Sessions are not drained on shutdown; BGP peers reconnect

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
