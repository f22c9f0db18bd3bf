//! Per-connection read loop: framing, validation and queue publication.
//!
//! One task per connection drives [`read_exact_deadline`] and
//! [`FrameHeader::decode`] over a single reusable buffer, publishing decoded
//! frames onto the connection's frame queue and byte counts onto the shared
//! size queue. Termination is always connection-local: a fatal error here
//! tears down this connection's transport and frame queue and nothing else.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, warn};

use crate::{
    frame::{Frame, FrameHeader, HEADER_LEN},
    lossy::LossySender,
    reader::{ReadOutcome, read_exact_deadline},
};

/// Drive one connection until it closes or fails.
///
/// The loop reads a nine-byte header, validates it, reads exactly the
/// declared payload, then publishes the frame and its total byte count with
/// non-blocking pushes. Idle timeouts (no bytes of the current header
/// accumulated) retry quietly; every other failure is terminal. Returning
/// drops both the transport and the frame-queue sender, closing the queue
/// exactly once and letting the decompression stage drain out.
pub async fn run<S>(
    mut stream: S,
    peer: SocketAddr,
    max_frame_bytes: usize,
    frames: LossySender<Frame>,
    sizes: LossySender<usize>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; max_frame_bytes];
    loop {
        match read_exact_deadline(&mut stream, &mut buf[..HEADER_LEN], peer).await {
            Ok(ReadOutcome::Complete) => {}
            Ok(ReadOutcome::Closed) => {
                debug!(%peer, "peer closed connection");
                break;
            }
            Err(e) if e.is_idle_timeout() => continue,
            Err(e) => {
                // Timeouts are a soft condition and never logged as errors.
                if !e.is_timeout() {
                    error!(%peer, error = %e, "unable to read from connection");
                }
                break;
            }
        }

        let header = match FrameHeader::decode(&buf[..HEADER_LEN], max_frame_bytes) {
            Ok(header) => header,
            Err(e) => {
                error!(%peer, error = %e, "illegal data received from client");
                break;
            }
        };

        let end = HEADER_LEN + header.payload_len;
        match read_exact_deadline(&mut stream, &mut buf[HEADER_LEN..end], peer).await {
            Ok(ReadOutcome::Complete) => {}
            Ok(ReadOutcome::Closed) => {
                warn!(%peer, "connection closed mid-frame");
                break;
            }
            Err(e) => {
                if !e.is_timeout() {
                    error!(%peer, error = %e, "unable to read frame payload");
                }
                break;
            }
        }

        frames.try_push(Frame {
            payload: Bytes::copy_from_slice(&buf[HEADER_LEN..end]),
            compressed: header.compressed,
        });
        sizes.try_push(end);
    }

    // Close the transport before the sender drops; write errors here mean
    // the peer is already gone.
    let _ = stream.shutdown().await;
}
