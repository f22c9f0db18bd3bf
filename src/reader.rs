//! Exact-length socket reads with a rolling idle deadline.
//!
//! The protocol has no delimiters beyond explicit length fields, so every
//! read wants an exact byte count. [`read_exact_deadline`] accumulates
//! partial reads until the buffer is full, re-arming a deadline before each
//! underlying read, and classifies every other outcome so the connection
//! loop can decide between retrying, stopping quietly and tearing down.

use std::{io, net::SocketAddr, time::Duration};

use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    time::timeout,
};

/// Deadline re-armed before every read from a peer.
pub const READ_DEADLINE: Duration = Duration::from_secs(60);

/// Successful outcomes of [`read_exact_deadline`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The buffer was filled completely.
    Complete,
    /// The peer closed the stream before any byte of this read arrived.
    ///
    /// A close between frames is not an error; the caller stops the
    /// connection without logging a failure.
    Closed,
}

/// Failure classification for [`read_exact_deadline`].
#[derive(Debug, Error)]
pub enum ReadError {
    /// End of stream after part of the expected bytes had arrived.
    #[error("peer {peer} closed the connection abruptly after {got} of {want} bytes")]
    ClosedAbruptly {
        /// Remote address, for diagnostics only.
        peer: SocketAddr,
        /// Bytes accumulated before the close.
        got: usize,
        /// Bytes the caller asked for.
        want: usize,
    },

    /// No data arrived within [`READ_DEADLINE`].
    #[error("read from peer {peer} timed out after {got} bytes")]
    TimedOut {
        /// Remote address, for diagnostics only.
        peer: SocketAddr,
        /// Bytes accumulated before the deadline fired.
        got: usize,
    },

    /// The transport failed outright.
    #[error("read from peer {peer} failed: {source}")]
    Io {
        /// Remote address, for diagnostics only.
        peer: SocketAddr,
        /// Underlying cause.
        #[source]
        source: io::Error,
    },
}

impl ReadError {
    /// Whether this is an idle timeout: the deadline fired before any byte
    /// of the current read accumulated.
    ///
    /// Idle timeouts are soft; the caller retries the read without logging
    /// an error. A timeout after partial accumulation is terminal because
    /// the frame boundary cannot be recovered.
    #[must_use]
    pub fn is_idle_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { got: 0, .. })
    }

    /// Whether this is any timeout, idle or mid-frame.
    ///
    /// Timeouts are never logged as errors by the connection loop.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Read exactly `buf.len()` bytes from `stream` into `buf`.
///
/// A [`READ_DEADLINE`] is re-armed before each underlying read, so a slow
/// but live peer can take arbitrarily long overall while a silent one is
/// bounded per read. Partial reads accumulate without loss or duplication.
///
/// # Errors
///
/// - [`ReadError::ClosedAbruptly`] when the stream ends mid-read.
/// - [`ReadError::TimedOut`] when a deadline expires; `got` records how much
///   of this read had accumulated, letting the caller distinguish an idle
///   peer from a stalled frame.
/// - [`ReadError::Io`] for any other transport failure.
pub async fn read_exact_deadline<S>(
    stream: &mut S,
    buf: &mut [u8],
    peer: SocketAddr,
) -> Result<ReadOutcome, ReadError>
where
    S: AsyncRead + Unpin,
{
    let want = buf.len();
    let mut got = 0;
    while got < want {
        match timeout(READ_DEADLINE, stream.read(&mut buf[got..])).await {
            Err(_) => return Err(ReadError::TimedOut { peer, got }),
            Ok(Err(source)) => return Err(ReadError::Io { peer, source }),
            Ok(Ok(0)) if got == 0 => return Ok(ReadOutcome::Closed),
            Ok(Ok(0)) => return Err(ReadError::ClosedAbruptly { peer, got, want }),
            Ok(Ok(n)) => got += n,
        }
    }
    Ok(ReadOutcome::Complete)
}
