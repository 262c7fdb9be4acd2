//! Outbound connection establishment.
//!
//! # Responsibilities
//! - Resolve the destination to addresses of its syntactic family
//! - Create the socket, apply the optional signer, then connect
//! - Bound the whole attempt by the configured dial timeout
//!
//! # Design Decisions
//! - One `Dialer` is built at startup and shared read-only by all sessions
//! - Signing failures are per-attempt dial errors, never startup errors
//! - No retries: a failed dial abandons the session

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::{lookup_host, TcpSocket, TcpStream};

use super::address::{AddressError, AddressFamily, Endpoint};
use super::tcp_md5::{ConnectionSigner, Md5Signature};
use crate::config::UpstreamConfig;

/// Error type for dial attempts.
#[derive(Debug, thiserror::Error)]
pub enum DialError {
    #[error("failed to resolve {destination}: {source}")]
    Resolve {
        destination: String,
        #[source]
        source: io::Error,
    },
    #[error("{destination} has no {family} address")]
    NoAddress {
        destination: String,
        family: AddressFamily,
    },
    #[error("failed to create socket: {0}")]
    Socket(#[source] io::Error),
    #[error("failed to apply TCP MD5 signature for {peer}: {source}")]
    Signature {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("connect to {peer} failed: {source}")]
    Connect {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
}

impl DialError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            DialError::Resolve { .. } | DialError::NoAddress { .. } => "resolve",
            DialError::Socket(_) => "socket",
            DialError::Signature { .. } => "signature",
            DialError::Connect { .. } => "connect",
            DialError::Timeout(_) => "timeout",
        }
    }
}

/// Error type for building a dialer.
#[derive(Debug, thiserror::Error)]
pub enum DialerError {
    #[error("invalid destination: {0}")]
    Destination(#[from] AddressError),
    #[error("invalid TCP MD5 key: {0}")]
    Key(#[source] io::Error),
}

/// Reusable connection-establishment capability.
#[derive(Debug, Clone)]
pub struct Dialer {
    destination: Endpoint,
    signer: Option<Arc<dyn ConnectionSigner>>,
}

impl Dialer {
    /// Build a dialer for `destination`, signing with `secret` when one is
    /// given and non-empty.
    pub fn build(
        destination: &str,
        secret: Option<&[u8]>,
        prefix_len: Option<u8>,
    ) -> Result<Self, DialerError> {
        let destination = Endpoint::parse(destination)?;
        let signer = match secret.filter(|key| !key.is_empty()) {
            Some(key) => {
                let signature = Md5Signature::new(key, prefix_len).map_err(DialerError::Key)?;
                Some(Arc::new(signature) as Arc<dyn ConnectionSigner>)
            }
            None => None,
        };
        Ok(Self {
            destination,
            signer,
        })
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self, DialerError> {
        Self::build(&config.address, config.md5_key(), config.md5_prefix_len)
    }

    /// Dialer without any socket options.
    pub fn plain(destination: Endpoint) -> Self {
        Self {
            destination,
            signer: None,
        }
    }

    /// Dialer using a caller-supplied signer.
    pub fn with_signer(destination: Endpoint, signer: Arc<dyn ConnectionSigner>) -> Self {
        Self {
            destination,
            signer: Some(signer),
        }
    }

    pub fn destination(&self) -> &Endpoint {
        &self.destination
    }

    pub fn is_signed(&self) -> bool {
        self.signer.is_some()
    }

    /// Open a new outbound connection, giving up after `timeout`.
    pub async fn dial(&self, timeout: Duration) -> Result<TcpStream, DialError> {
        self.dial_until(Instant::now() + timeout).await
    }

    /// Open a new outbound connection, giving up at `deadline`.
    pub async fn dial_until(&self, deadline: Instant) -> Result<TcpStream, DialError> {
        let budget = deadline.saturating_duration_since(Instant::now());
        tokio::time::timeout_at(deadline.into(), self.dial_inner())
            .await
            .map_err(|_| DialError::Timeout(budget))?
    }

    async fn dial_inner(&self) -> Result<TcpStream, DialError> {
        let family = self.destination.family();
        let addrs: Vec<SocketAddr> = lookup_host(self.destination.as_str())
            .await
            .map_err(|source| DialError::Resolve {
                destination: self.destination.to_string(),
                source,
            })?
            .filter(|addr| family.matches(addr.ip()))
            .collect();

        let mut last_err = None;
        for addr in addrs {
            match self.connect_one(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::debug!(peer = %addr, error = %e, "Dial attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| DialError::NoAddress {
            destination: self.destination.to_string(),
            family,
        }))
    }

    async fn connect_one(&self, addr: SocketAddr) -> Result<TcpStream, DialError> {
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(DialError::Socket)?;

        if let Some(signer) = &self.signer {
            signer
                .apply(&socket, addr.ip())
                .map_err(|source| DialError::Signature { peer: addr, source })?;
        }

        socket
            .connect(addr)
            .await
            .map_err(|source| DialError::Connect { peer: addr, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::sync::Mutex;
    use tokio::net::TcpListener;

    /// Records each application and whether the socket was still unbound.
    #[derive(Debug, Default)]
    struct RecordingSigner {
        calls: Mutex<Vec<(IpAddr, bool)>>,
    }

    impl ConnectionSigner for RecordingSigner {
        fn apply(&self, socket: &TcpSocket, peer: IpAddr) -> io::Result<()> {
            let unbound = socket.local_addr().map(|a| a.port() == 0).unwrap_or(true);
            self.calls.lock().unwrap().push((peer, unbound));
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FailingSigner;

    impl ConnectionSigner for FailingSigner {
        fn apply(&self, _socket: &TcpSocket, _peer: IpAddr) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Unsupported, "no signatures here"))
        }
    }

    async fn destination() -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = Endpoint::parse(&listener.local_addr().unwrap().to_string()).unwrap();
        (listener, endpoint)
    }

    #[test]
    fn empty_secret_builds_plain_dialer() {
        let dialer = Dialer::build("127.0.0.1:179", Some(&b""[..]), None).unwrap();
        assert!(!dialer.is_signed());

        let dialer = Dialer::build("127.0.0.1:179", None, None).unwrap();
        assert!(!dialer.is_signed());

        let dialer = Dialer::build("127.0.0.1:179", Some(&b"secret"[..]), None).unwrap();
        assert!(dialer.is_signed());
    }

    #[test]
    fn build_rejects_bad_inputs() {
        assert!(matches!(
            Dialer::build("nowhere", None, None),
            Err(DialerError::Destination(_))
        ));
        assert!(matches!(
            Dialer::build("127.0.0.1:179", Some(&[b'k'; 81][..]), None),
            Err(DialerError::Key(_))
        ));
    }

    #[tokio::test]
    async fn plain_dial_connects() {
        let (listener, endpoint) = destination().await;
        let dialer = Dialer::plain(endpoint);

        let stream = dialer.dial(Duration::from_secs(2)).await.unwrap();
        let (_accepted, peer) = listener.accept().await.unwrap();
        assert_eq!(stream.local_addr().unwrap(), peer);
    }

    #[tokio::test]
    async fn signer_runs_before_connect() {
        let (listener, endpoint) = destination().await;
        let signer = Arc::new(RecordingSigner::default());
        let dialer = Dialer::with_signer(endpoint, signer.clone());

        let _stream = dialer.dial(Duration::from_secs(2)).await.unwrap();
        let _accepted = listener.accept().await.unwrap();

        let calls = signer.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ("127.0.0.1".parse::<IpAddr>().unwrap(), true));
    }

    #[tokio::test]
    async fn signer_failure_fails_the_dial_without_connecting() {
        let (listener, endpoint) = destination().await;
        let dialer = Dialer::with_signer(endpoint, Arc::new(FailingSigner));

        let err = dialer.dial(Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(err, DialError::Signature { .. }));
        assert_eq!(err.reason(), "signature");

        let accepted =
            tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
        assert!(accepted.is_err(), "no handshake may reach the destination");
    }

    #[tokio::test]
    async fn deadline_bounds_the_whole_attempt() {
        let endpoint = Endpoint::parse("10.255.255.1:179").unwrap();
        let deadline = Instant::now() + Duration::from_millis(150);

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            Dialer::plain(endpoint).dial_until(deadline),
        )
        .await
        .expect("dial gives up at its deadline");

        // Unroutable: either the deadline fires or the network refuses fast.
        match result.unwrap_err() {
            DialError::Timeout(budget) => assert!(budget <= Duration::from_millis(150)),
            DialError::Connect { .. } => {}
            other => panic!("unexpected dial error: {}", other),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let (listener, endpoint) = destination().await;
        drop(listener);

        let err = Dialer::plain(endpoint)
            .dial(Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, DialError::Connect { .. }));
    }
}
