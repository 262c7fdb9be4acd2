//! Failure injection tests for the relay.

use std::time::Duration;

use md5_relay::relay::DirectionStatus;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

mod common;

/// Close `stream` with a RST instead of a FIN.
#[allow(deprecated)]
fn reset(stream: TcpStream) {
    stream.set_linger(Some(Duration::ZERO)).unwrap();
    drop(stream);
}

#[tokio::test]
async fn test_destination_reset_is_failure_and_closes_client() {
    let (destination, destination_addr) = common::destination().await;
    let mut relay = common::start_relay(&destination_addr.to_string()).await;

    let mut client = TcpStream::connect(relay.addr).await.unwrap();
    let (mut upstream, _) = destination.accept().await.unwrap();

    client.write_all(b"KEEPALIVE\n").await.unwrap();
    let mut buf = [0u8; 10];
    upstream.read_exact(&mut buf).await.unwrap();

    reset(upstream);

    let leftover = common::read_until_closed(&mut client, Duration::from_secs(2)).await;
    assert!(leftover.is_empty());

    let report = relay.next_report().await;
    assert_eq!(report.sent.bytes, 10);
    assert!(report.received.is_failure());
    assert!(matches!(report.received.status, DirectionStatus::Failed(_)));
    assert!(!report.sent.is_failure());

    relay.shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_sessions_are_isolated() {
    let (destination, destination_addr) = common::destination().await;
    let mut relay = common::start_relay(&destination_addr.to_string()).await;

    let mut client_a = TcpStream::connect(relay.addr).await.unwrap();
    let (upstream_a, _) = destination.accept().await.unwrap();
    let mut client_b = TcpStream::connect(relay.addr).await.unwrap();
    let (mut upstream_b, _) = destination.accept().await.unwrap();

    // Kill session A from the destination side.
    reset(upstream_a);
    let leftover = common::read_until_closed(&mut client_a, Duration::from_secs(2)).await;
    assert!(leftover.is_empty());

    let report_a = relay.next_report().await;
    assert!(report_a.received.is_failure());

    // Session B still relays in both directions.
    client_b.write_all(b"UPDATE\n").await.unwrap();
    let mut update = [0u8; 7];
    upstream_b.read_exact(&mut update).await.unwrap();
    assert_eq!(&update, b"UPDATE\n");

    upstream_b.write_all(b"ACK\n").await.unwrap();
    let mut ack = [0u8; 4];
    client_b.read_exact(&mut ack).await.unwrap();
    assert_eq!(&ack, b"ACK\n");

    // Kill session B from the client side this time.
    reset(client_b);
    let report_b = relay.next_report().await;
    assert_ne!(report_a.id, report_b.id);
    assert_eq!(report_b.received.bytes, 4);
    assert_eq!(report_b.sent.bytes, 7);

    let leftover = common::read_until_closed(&mut upstream_b, Duration::from_secs(2)).await;
    assert!(leftover.is_empty());

    relay.shutdown.trigger();
}

#[tokio::test]
async fn test_client_close_unblocks_idle_destination_leg() {
    let (destination, destination_addr) = common::destination().await;
    let mut relay = common::start_relay(&destination_addr.to_string()).await;

    let client = TcpStream::connect(relay.addr).await.unwrap();
    let (mut upstream, _) = destination.accept().await.unwrap();

    // Neither side has sent anything; both directions are parked on reads.
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(client);

    let report = relay.next_report().await;
    assert!(matches!(report.sent.status, DirectionStatus::Eof));
    assert!(matches!(report.received.status, DirectionStatus::Closed));

    let leftover = common::read_until_closed(&mut upstream, Duration::from_secs(2)).await;
    assert!(leftover.is_empty());

    relay.shutdown.trigger();
}

#[tokio::test]
async fn test_unroutable_destination_abandons_session() {
    // Either times out or fails fast as unreachable; both abandon the session.
    let mut relay = common::start_relay("10.255.255.1:179").await;

    let mut client = TcpStream::connect(relay.addr).await.unwrap();
    let relayed = common::read_until_closed(&mut client, Duration::from_secs(5)).await;
    assert!(relayed.is_empty());

    // No session ever started, so no report was produced.
    assert!(relay.reports.try_recv().is_err());
    assert!(!relay.task.is_finished());

    relay.shutdown.trigger();
}
