//! Errors raised by [`Receiver`](super::Receiver) startup.

use std::io;

use thiserror::Error;

use crate::tls::TlsConfigError;

/// Startup failures fatal to the whole receiver.
///
/// Once serving, failures are task-local and surface only through logs.
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// Binding the listener failed.
    #[error("unable to start listener socket: {0}")]
    Bind(#[from] io::Error),

    /// Loading the TLS configuration failed.
    #[error("unable to start TLS listener: {0}")]
    Tls(#[from] TlsConfigError),

    /// Authentication was enabled without a handshake implementation.
    #[error("authentication enabled but no authenticator installed")]
    MissingAuthenticator,

    /// The configured frame buffer size cannot back a connection.
    #[error("unusable maximum frame size: {kb} KiB")]
    FrameSize {
        /// The configured size in kilobytes.
        kb: usize,
    },
}
