//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the shared dialer from the upstream configuration
//! - Bind the listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The dialer is built before binding, so a bad key never opens a port

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::net::dialer::{Dialer, DialerError};
use crate::net::listener::{Listener, ListenerError};

/// Error type for startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Dialer(#[from] DialerError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Everything the accept loop needs.
#[derive(Debug)]
pub struct Started {
    pub listener: Listener,
    pub dialer: Arc<Dialer>,
}

pub async fn start(config: &RelayConfig) -> Result<Started, StartupError> {
    let dialer = Arc::new(Dialer::from_config(&config.upstream)?);

    tracing::info!(
        target_address = %dialer.destination(),
        family = %dialer.destination().family(),
        tcp_md5 = dialer.is_signed(),
        connect_timeout_secs = config.timeouts.connect_secs,
        "Dialer ready"
    );

    let listener = Listener::bind(&config.listener).await?;

    Ok(Started { listener, dialer })
}
