//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use md5_relay::lifecycle::startup;
use md5_relay::relay::SessionReport;
use md5_relay::{RelayConfig, RelayServer, Shutdown};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A relay running on an ephemeral port.
pub struct RunningRelay {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub reports: mpsc::Receiver<SessionReport>,
    pub task: JoinHandle<Result<(), md5_relay::net::ListenerError>>,
}

impl RunningRelay {
    /// Wait for the next finished session.
    pub async fn next_report(&mut self) -> SessionReport {
        tokio::time::timeout(Duration::from_secs(5), self.reports.recv())
            .await
            .expect("session report within 5s")
            .expect("relay still running")
    }
}

/// Start a relay forwarding to `destination`.
pub async fn start_relay(destination: &str) -> RunningRelay {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.address = destination.into();
    config.timeouts.connect_secs = 2;

    let started = startup::start(&config).await.unwrap();
    let addr = started.listener.local_addr().unwrap();

    let (tx, reports) = mpsc::channel(64);
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = RelayServer::new(&config, started.dialer).with_reports(tx);

    let task = tokio::spawn(server.run(started.listener, server_shutdown));

    RunningRelay {
        addr,
        shutdown,
        reports,
        task,
    }
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Bind a destination listener on an ephemeral port.
pub async fn destination() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Start a destination that echoes every byte back until the peer closes.
#[allow(dead_code)]
pub async fn start_echo_destination() -> SocketAddr {
    let (listener, addr) = destination().await;

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let (mut reader, mut writer) = socket.split();
                        let _ = tokio::io::copy(&mut reader, &mut writer).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read until EOF or error, bounded by `limit`; returns what arrived.
#[allow(dead_code)]
pub async fn read_until_closed(stream: &mut TcpStream, limit: Duration) -> Vec<u8> {
    let mut buf = Vec::new();
    tokio::time::timeout(limit, async {
        let mut chunk = [0u8; 1024];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
    })
    .await
    .expect("connection closed in time");
    buf
}
