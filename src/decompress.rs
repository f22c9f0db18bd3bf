//! Per-connection decompression stage.
//!
//! Consumes frames from a connection's queue until it closes, decompressing
//! flagged payloads and forwarding the result to the shared output queue. A
//! corrupt compressed block does not imply an untrustworthy connection, so a
//! failed frame is logged and dropped while the stage keeps serving; this
//! deliberately differs from the fatal-on-error policy of the read loop.

use std::{io::Read, sync::Arc};

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

use crate::{frame::Frame, lossy::LossySender};

/// Error returned by a [`Decompress`] implementation.
#[derive(Debug, Error)]
#[error("decompression failed: {0}")]
pub struct DecompressError(#[from] std::io::Error);

/// Collaborator turning compressed payloads back into raw bytes.
pub trait Decompress: Send + Sync {
    /// Decompress one frame payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecompressError`] for a corrupt or truncated block; the
    /// caller drops the frame and continues.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecompressError>;
}

/// zstd-backed [`Decompress`] implementation used by default.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZstdDecompressor;

impl Decompress for ZstdDecompressor {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecompressError> {
        let mut decoder = zstd::stream::read::Decoder::new(data)?;
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

/// Compress a payload the way senders are expected to.
///
/// Provided for senders and tests; the receiver itself only decompresses.
///
/// # Errors
///
/// Returns [`DecompressError`] if encoding fails.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, DecompressError> {
    Ok(zstd::bulk::compress(data, 0)?)
}

/// Drain `frames` until the queue closes, forwarding decoded payloads to
/// the shared output queue.
///
/// Output pushes are non-blocking: a saturated output queue sheds the
/// payload rather than stalling this stage.
pub async fn run(
    mut frames: mpsc::Receiver<Frame>,
    output: LossySender<Bytes>,
    decompressor: Arc<dyn Decompress>,
) {
    while let Some(frame) = frames.recv().await {
        let payload = if frame.compressed {
            match decompressor.decompress(&frame.payload) {
                Ok(decoded) => Bytes::from(decoded),
                Err(e) => {
                    warn!(error = %e, "dropping undecodable frame");
                    continue;
                }
            }
        } else {
            frame.payload
        };
        output.try_push(payload);
    }
}
