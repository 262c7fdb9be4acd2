//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, sequential accept)
//!     → connection.rs (session id, active tracking)
//!     → Hand off to relay layer
//!
//! Outgoing TCP connection
//!     → address.rs (host:port, syntactic family)
//!     → dialer.rs (resolve, socket, sign, connect under deadline)
//!     → tcp_md5.rs (TCP_MD5SIG_EXT before the SYN)
//! ```
//!
//! # Design Decisions
//! - Sockets are created unconnected so options apply before the handshake
//! - The dialer is built once and shared read-only
//! - Platform-specific option encoding stays behind `ConnectionSigner`

pub mod address;
pub mod connection;
pub mod dialer;
pub mod listener;
pub mod tcp_md5;

pub use address::{AddressFamily, Endpoint};
pub use dialer::{DialError, Dialer};
pub use listener::{Listener, ListenerError};
pub use tcp_md5::{ConnectionSigner, Md5Signature};
