//! Output destinations for decoded payloads.
//!
//! A single writer task drains the shared output queue in FIFO order. The
//! first write failure is terminal for the writer: no further output is
//! attempted for the lifetime of the process, while the rest of the
//! pipeline keeps running and sheds load once the output queue saturates.

use std::{io, path::Path};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncWriteExt, Stdout},
    sync::mpsc,
};
use tracing::error;

/// Error returned by an [`OutputSink`] write.
#[derive(Debug, Error)]
#[error("output write failed: {0}")]
pub struct SinkError(#[from] io::Error);

/// Destination for decoded payloads.
///
/// A returned error is treated as terminal by the writer task.
#[async_trait]
pub trait OutputSink: Send {
    /// Write one payload to the destination.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] on a failed or partial write.
    async fn write(&mut self, payload: &[u8]) -> Result<(), SinkError>;
}

/// Sink writing payloads to standard output.
#[derive(Debug)]
pub struct StdoutSink {
    out: Stdout,
}

impl StdoutSink {
    #[must_use]
    pub fn new() -> Self {
        Self {
            out: tokio::io::stdout(),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputSink for StdoutSink {
    async fn write(&mut self, payload: &[u8]) -> Result<(), SinkError> {
        self.out.write_all(payload).await?;
        self.out.flush().await?;
        Ok(())
    }
}

/// Sink appending payloads to a file.
#[derive(Debug)]
pub struct FileSink {
    file: File,
}

impl FileSink {
    /// Open `path` for appending, creating it if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the file cannot be opened.
    pub async fn open(path: &Path) -> Result<Self, SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self { file })
    }
}

#[async_trait]
impl OutputSink for FileSink {
    async fn write(&mut self, payload: &[u8]) -> Result<(), SinkError> {
        self.file.write_all(payload).await?;
        Ok(())
    }
}

/// Drain the shared output queue until it closes or a write fails.
pub async fn run(mut output: mpsc::Receiver<Bytes>, mut sink: Box<dyn OutputSink>) {
    while let Some(payload) = output.recv().await {
        if let Err(e) = sink.write(&payload).await {
            error!(error = %e, "output sink failed; stopping writer");
            return;
        }
    }
}
