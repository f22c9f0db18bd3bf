//! Integration tests for deadline-bounded exact reads.
//!
//! These drive [`read_exact_deadline`] over in-memory duplex streams so
//! chunked delivery, abrupt closure and idle peers can be simulated
//! precisely.

use std::net::SocketAddr;

use pktstream::reader::{ReadError, ReadOutcome, read_exact_deadline};
use tokio::io::AsyncWriteExt;

fn peer() -> SocketAddr {
    "127.0.0.1:9999".parse().expect("addr")
}

#[tokio::test]
async fn one_byte_chunks_accumulate_without_loss() {
    // A one-byte pipe forces the reader through nine partial reads.
    let (mut tx, mut rx) = tokio::io::duplex(1);
    let writer = tokio::spawn(async move {
        for b in 0u8..9 {
            tx.write_all(&[b]).await.expect("write");
        }
        tx
    });

    let mut buf = [0u8; 9];
    let outcome = read_exact_deadline(&mut rx, &mut buf, peer())
        .await
        .expect("read");
    assert_eq!(outcome, ReadOutcome::Complete);
    assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6, 7, 8]);
    writer.await.expect("writer");
}

#[tokio::test]
async fn close_before_any_byte_is_graceful() {
    let (tx, mut rx) = tokio::io::duplex(64);
    drop(tx);

    let mut buf = [0u8; 9];
    let outcome = read_exact_deadline(&mut rx, &mut buf, peer())
        .await
        .expect("read");
    assert_eq!(outcome, ReadOutcome::Closed);
}

#[tokio::test]
async fn close_mid_read_is_abrupt() {
    let (mut tx, mut rx) = tokio::io::duplex(64);
    tx.write_all(b"abc").await.expect("write");
    drop(tx);

    let mut buf = [0u8; 9];
    let err = read_exact_deadline(&mut rx, &mut buf, peer())
        .await
        .expect_err("must fail");
    assert!(matches!(
        err,
        ReadError::ClosedAbruptly { got: 3, want: 9, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn silent_peer_times_out_idle() {
    let (_tx, mut rx) = tokio::io::duplex(64);

    let mut buf = [0u8; 9];
    let err = read_exact_deadline(&mut rx, &mut buf, peer())
        .await
        .expect_err("must time out");
    assert!(err.is_idle_timeout());
    assert!(err.is_timeout());
}

#[tokio::test(start_paused = true)]
async fn stalled_frame_times_out_as_partial() {
    let (mut tx, mut rx) = tokio::io::duplex(64);
    tx.write_all(b"abc").await.expect("write");

    let mut buf = [0u8; 9];
    let err = read_exact_deadline(&mut rx, &mut buf, peer())
        .await
        .expect_err("must time out");
    assert!(matches!(err, ReadError::TimedOut { got: 3, .. }));
    assert!(!err.is_idle_timeout());
    drop(tx);
}

#[tokio::test]
async fn zero_length_read_succeeds_immediately() {
    let (_tx, mut rx) = tokio::io::duplex(64);

    let mut buf = [0u8; 0];
    let outcome = read_exact_deadline(&mut rx, &mut buf, peer())
        .await
        .expect("read");
    assert_eq!(outcome, ReadOutcome::Complete);
}
