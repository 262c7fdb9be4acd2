//! One copy direction of a session.
//!
//! A direction reads from one socket and writes to the other until the
//! source reaches EOF, an I/O error occurs, or the sibling direction tears
//! the session down. Whatever ends it, the direction shuts down its write
//! side and requests teardown of the whole session before reporting.

use std::fmt;
use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::teardown::Teardown;

/// Matches the buffer size of a typical `io::copy` loop.
pub const COPY_BUFFER_SIZE: usize = 32 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Inbound peer → destination.
    Sent,
    /// Destination → inbound peer.
    Received,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Sent => "sent",
            Direction::Received => "received",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a direction ended.
#[derive(Debug)]
pub enum DirectionStatus {
    /// The source closed cleanly.
    Eof,
    /// The sibling direction tore the session down first.
    Closed,
    /// Unexpected I/O error.
    Failed(io::Error),
}

impl DirectionStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, DirectionStatus::Failed(_))
    }
}

impl fmt::Display for DirectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectionStatus::Eof => f.write_str("eof"),
            DirectionStatus::Closed => f.write_str("closed"),
            DirectionStatus::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Final accounting for one direction.
#[derive(Debug)]
pub struct DirectionReport {
    pub direction: Direction,
    /// Bytes accepted by the destination socket, partial writes included.
    pub bytes: u64,
    pub status: DirectionStatus,
}

impl DirectionReport {
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}

/// Relay bytes from `reader` to `writer` until a terminal event.
///
/// Always requests teardown before returning, so a sibling blocked on a
/// read is released.
pub async fn copy_direction<R, W>(
    direction: Direction,
    mut reader: R,
    mut writer: W,
    teardown: Teardown,
) -> DirectionReport
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut bytes: u64 = 0;

    let status = loop {
        let n = tokio::select! {
            biased;
            _ = teardown.closed() => break DirectionStatus::Closed,
            res = reader.read(&mut buf) => match res {
                Ok(0) => break DirectionStatus::Eof,
                Ok(n) => n,
                Err(e) => break DirectionStatus::Failed(e),
            },
        };

        // Partial writes count as soon as they land.
        let mut written = 0;
        let interrupted = loop {
            if written == n {
                break None;
            }
            tokio::select! {
                biased;
                _ = teardown.closed() => break Some(DirectionStatus::Closed),
                res = writer.write(&buf[written..n]) => match res {
                    Ok(0) => break Some(DirectionStatus::Failed(io::ErrorKind::WriteZero.into())),
                    Ok(k) => {
                        written += k;
                        bytes += k as u64;
                    }
                    Err(e) => break Some(DirectionStatus::Failed(e)),
                },
            }
        };

        if let Some(status) = interrupted {
            break status;
        }
    };

    if !matches!(status, DirectionStatus::Failed(_)) {
        let _ = writer.shutdown().await;
    }
    teardown.close();

    DirectionReport {
        direction,
        bytes,
        status,
    }
}
