//! Lifecycle events.
//!
//! Every call is fire-and-forget: events go to `tracing` and the metrics
//! facade, neither of which can fail or block the caller.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::net::connection::SessionId;
use crate::net::dialer::DialError;
use crate::observability::metrics;
use crate::relay::direction::DirectionReport;
use crate::relay::session::SessionReport;

pub fn listening(local: SocketAddr, destination: &str, signed: bool) {
    tracing::info!(
        address = %local,
        destination = %destination,
        tcp_md5 = signed,
        "Listening for connections"
    );
}

pub fn accepted(id: SessionId, peer: SocketAddr) {
    metrics::record_session_accepted();
    tracing::info!(session_id = %id, peer_addr = %peer, "Accepted connection");
}

pub fn connected(id: SessionId, peer: SocketAddr, outbound: &TcpStream, elapsed: Duration) {
    match outbound.peer_addr() {
        Ok(remote) => tracing::info!(
            session_id = %id,
            peer_addr = %peer,
            remote_addr = %remote,
            elapsed_ms = elapsed.as_millis() as u64,
            "Connected to destination"
        ),
        Err(_) => tracing::info!(
            session_id = %id,
            peer_addr = %peer,
            elapsed_ms = elapsed.as_millis() as u64,
            "Connected to destination"
        ),
    }
}

pub fn dial_failed(id: SessionId, peer: SocketAddr, destination: &str, error: &DialError) {
    metrics::record_dial_failure(error.reason());
    tracing::warn!(
        session_id = %id,
        peer_addr = %peer,
        destination = %destination,
        error = %error,
        "Dial failed, closing inbound connection"
    );
}

pub fn direction_closed(id: SessionId, report: &DirectionReport) {
    metrics::record_direction(report.direction.as_str(), report.bytes, report.is_failure());
    if report.is_failure() {
        tracing::warn!(
            session_id = %id,
            direction = %report.direction,
            bytes = report.bytes,
            status = %report.status,
            "Direction ended with error"
        );
    } else {
        tracing::info!(
            session_id = %id,
            direction = %report.direction,
            bytes = report.bytes,
            status = %report.status,
            "Direction closed"
        );
    }
}

pub fn session_closed(report: &SessionReport) {
    metrics::record_session_duration(report.duration);
    tracing::info!(
        session_id = %report.id,
        peer_addr = %report.peer,
        sent = report.sent.bytes,
        received = report.received.bytes,
        duration_ms = report.duration.as_millis() as u64,
        "Session closed"
    );
}

pub fn accept_failed(error: &dyn std::error::Error) {
    tracing::error!(error = %error, "Accept failed, stopping relay");
}
