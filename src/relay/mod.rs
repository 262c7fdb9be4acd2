//! Relay subsystem.
//!
//! # Data Flow
//! ```text
//! server.rs (accept loop)
//!     → session.rs establish (dial under deadline)
//!     → session.rs relay, on its own task
//!         ├─ spawned: direction.rs  inbound  → outbound
//!         └─ inline:  direction.rs  outbound → inbound
//!     → teardown.rs (first terminal event closes both legs)
//!     → SessionReport → events
//! ```
//!
//! # Design Decisions
//! - Payload is never inspected, only counted
//! - No read/write timeouts once relaying
//! - Closing is idempotent; the second close is a no-op

pub mod direction;
pub mod server;
pub mod session;
pub mod teardown;

pub use direction::{Direction, DirectionReport, DirectionStatus};
pub use server::RelayServer;
pub use session::{Session, SessionError, SessionReport};
pub use teardown::Teardown;
