//! The accept loop.
//!
//! # Responsibilities
//! - Accept inbound connections sequentially
//! - Dial the destination inline for each one
//! - Hand established sessions to their own task
//! - Stop on a fatal accept error or a shutdown signal
//!
//! # Design Decisions
//! - Dial latency for connection N delays accepting N+1
//! - Any accept error ends the loop; supervision is external
//! - Sessions share nothing but the read-only dialer

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use super::session::{Session, SessionReport};
use crate::config::RelayConfig;
use crate::net::connection::SessionTracker;
use crate::net::dialer::Dialer;
use crate::net::listener::{Listener, ListenerError};
use crate::observability::events;

/// TCP-MD5 relay server.
pub struct RelayServer {
    dialer: Arc<Dialer>,
    dial_timeout: Duration,
    tracker: SessionTracker,
    reports: Option<mpsc::Sender<SessionReport>>,
}

impl RelayServer {
    /// Create a relay server with the given configuration and dialer.
    pub fn new(config: &RelayConfig, dialer: Arc<Dialer>) -> Self {
        Self {
            dialer,
            dial_timeout: config.timeouts.connect(),
            tracker: SessionTracker::new(),
            reports: None,
        }
    }

    /// Forward the report of every finished session to `tx`.
    ///
    /// Reports that find the channel full or closed are dropped; relaying is
    /// never held up by a slow observer.
    pub fn with_reports(mut self, tx: mpsc::Sender<SessionReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    /// Run the accept loop until an accept error or shutdown.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        if let Ok(addr) = listener.local_addr() {
            events::listening(addr, self.dialer.destination().as_str(), self.dialer.is_signed());
        }

        loop {
            let (stream, peer) = tokio::select! {
                res = listener.accept() => match res {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        events::accept_failed(&e);
                        return Err(e);
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!(
                        active_sessions = self.tracker.active_count(),
                        "Relay received shutdown signal, no longer accepting"
                    );
                    return Ok(());
                }
            };

            let guard = self.tracker.track();
            events::accepted(guard.id(), peer);

            let session =
                match Session::establish(stream, peer, &self.dialer, self.dial_timeout, guard).await {
                    Ok(session) => session,
                    // Logged by the session; the loop carries on.
                    Err(_) => continue,
                };

            let reports = self.reports.clone();
            tokio::spawn(async move {
                let report = session.relay().await;
                if let Some(tx) = reports {
                    if let Err(e) = tx.try_send(report) {
                        tracing::debug!(error = %e, "Session report dropped");
                    }
                }
            });
        }
    }
}
