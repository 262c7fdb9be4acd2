//! TCP-MD5 signing relay for BGP sessions.
//!
//! Accepts plain TCP connections and relays each one, byte for byte, over
//! an outbound connection that carries the RFC 2385 TCP-MD5 signature
//! option.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                  MD5 RELAY                   │
//!   BGP speaker        │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │   BGP peer
//!   (no TCP-MD5) ──────┼─▶│   net    │──▶│  relay   │──▶│   net    │──┼──▶ (TCP-MD5)
//!                ◀─────┼──│ listener │◀──│ session  │◀──│  dialer  │◀─┼───
//!                      │  └──────────┘   └──────────┘   └──────────┘  │
//!                      │                                              │
//!                      │  ┌────────┐ ┌───────────────┐ ┌───────────┐  │
//!                      │  │ config │ │ observability │ │ lifecycle │  │
//!                      │  └────────┘ └───────────────┘ └───────────┘  │
//!                      └──────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;

pub use config::schema::RelayConfig;
pub use lifecycle::Shutdown;
pub use net::dialer::Dialer;
pub use relay::RelayServer;
