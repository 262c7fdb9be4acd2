//! One inbound connection paired with one outbound connection.
//!
//! # Lifecycle
//! ```text
//! establish:  accept → dial (bounded) ─┬─ ok   → Session
//!                                      └─ err  → inbound closed, abandoned
//! relay:      spawn  inbound → outbound  (sent)
//!             inline outbound → inbound  (received)
//!             first terminal event tears down both, join, report
//! ```

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;

use super::direction::{copy_direction, Direction, DirectionReport, DirectionStatus};
use super::teardown::{Teardown, TeardownGuard};
use crate::net::connection::{SessionGuard, SessionId, SessionTracker};
use crate::net::dialer::{DialError, Dialer};
use crate::observability::events;

/// Error type for session establishment.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session {id}: {source}")]
    Dial {
        id: SessionId,
        #[source]
        source: DialError,
    },
}

/// Final accounting for a session.
#[derive(Debug)]
pub struct SessionReport {
    pub id: SessionId,
    pub peer: SocketAddr,
    pub destination: Option<SocketAddr>,
    pub sent: DirectionReport,
    pub received: DirectionReport,
    pub duration: Duration,
}

/// A connected pair of sockets, ready to relay.
#[derive(Debug)]
pub struct Session {
    guard: SessionGuard,
    peer: SocketAddr,
    inbound: TcpStream,
    outbound: TcpStream,
    created_at: Instant,
    dial_deadline: Instant,
}

impl Session {
    /// Dial the destination for `inbound`.
    ///
    /// On failure the inbound connection is closed and no copy direction is
    /// ever started.
    pub async fn establish(
        inbound: TcpStream,
        peer: SocketAddr,
        dialer: &Dialer,
        dial_timeout: Duration,
        guard: SessionGuard,
    ) -> Result<Session, SessionError> {
        let created_at = Instant::now();
        let dial_deadline = created_at + dial_timeout;

        match dialer.dial_until(dial_deadline).await {
            Ok(outbound) => {
                events::connected(guard.id(), peer, &outbound, created_at.elapsed());
                Ok(Session {
                    guard,
                    peer,
                    inbound,
                    outbound,
                    created_at,
                    dial_deadline,
                })
            }
            Err(source) => {
                drop(inbound);
                events::dial_failed(guard.id(), peer, dialer.destination().as_str(), &source);
                Err(SessionError::Dial {
                    id: guard.id(),
                    source,
                })
            }
        }
    }

    pub fn id(&self) -> SessionId {
        self.guard.id()
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn dial_deadline(&self) -> Instant {
        self.dial_deadline
    }

    /// Relay in both directions until either side ends, then close both
    /// sockets.
    pub async fn relay(self) -> SessionReport {
        let Session {
            guard,
            peer,
            inbound,
            outbound,
            ..
        } = self;
        let id = guard.id();
        let destination = outbound.peer_addr().ok();
        let started = Instant::now();

        let (inbound_read, inbound_write) = inbound.into_split();
        let (outbound_read, outbound_write) = outbound.into_split();

        let teardown = Teardown::new();

        let sent = tokio::spawn(copy_direction(
            Direction::Sent,
            inbound_read,
            outbound_write,
            teardown.clone(),
        ));

        let received = {
            let _guard = TeardownGuard::new(teardown.clone());
            copy_direction(Direction::Received, outbound_read, inbound_write, teardown).await
        };

        let sent = match sent.await {
            Ok(report) => report,
            Err(e) => DirectionReport {
                direction: Direction::Sent,
                bytes: 0,
                status: DirectionStatus::Failed(std::io::Error::other(e)),
            },
        };

        events::direction_closed(id, &sent);
        events::direction_closed(id, &received);

        let report = SessionReport {
            id,
            peer,
            destination,
            sent,
            received,
            duration: started.elapsed(),
        };
        events::session_closed(&report);

        drop(guard);
        report
    }
}

/// Accept-to-teardown handling of one inbound connection.
pub async fn start(
    inbound: TcpStream,
    peer: SocketAddr,
    dialer: &Dialer,
    dial_timeout: Duration,
    tracker: &SessionTracker,
) -> Result<SessionReport, SessionError> {
    let session = Session::establish(inbound, peer, dialer, dial_timeout, tracker.track()).await?;
    Ok(session.relay().await)
}
