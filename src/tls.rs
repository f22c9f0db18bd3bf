//! Transport setup: plain TCP or server-side TLS.
//!
//! TLS configuration is loaded once at acceptor startup; a bad certificate
//! or key is fatal to the whole receiver. After acceptance both transports
//! are wrapped in [`TransportStream`] so the rest of the pipeline never
//! distinguishes them.

use std::{
    io,
    path::Path,
    pin::Pin,
    task::{Context, Poll},
};

use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    net::TcpStream,
};
use tokio_rustls::{
    rustls::{
        self,
        pki_types::{CertificateDer, PrivateKeyDer},
    },
    server::TlsStream,
};

/// Errors raised while loading the TLS server configuration.
#[derive(Debug, Error)]
pub enum TlsConfigError {
    /// A certificate or key file could not be read or parsed as PEM.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path of the offending file.
        path: String,
        /// Underlying cause.
        #[source]
        source: io::Error,
    },

    /// The key file contained no private key.
    #[error("no private key found in {0}")]
    MissingKey(String),

    /// The certificate chain and key were rejected.
    #[error("invalid certificate or key: {0}")]
    Invalid(#[from] rustls::Error),
}

/// Load a server TLS configuration from PEM certificate and key files.
///
/// # Errors
///
/// Returns [`TlsConfigError`] when either file is unreadable, the key file
/// holds no key, or rustls rejects the pair. Callers treat any of these as
/// fatal to the receiver.
pub fn load_tls_config(
    cert_path: &Path,
    key_path: &Path,
) -> Result<rustls::ServerConfig, TlsConfigError> {
    let certs = read_certs(cert_path)?;
    let key = read_key(key_path)?;
    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    Ok(config)
}

fn read_error(path: &Path, source: io::Error) -> TlsConfigError {
    TlsConfigError::Read {
        path: path.display().to_string(),
        source,
    }
}

fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsConfigError> {
    let data = std::fs::read(path).map_err(|e| read_error(path, e))?;
    rustls_pemfile::certs(&mut data.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| read_error(path, e))
}

fn read_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsConfigError> {
    let data = std::fs::read(path).map_err(|e| read_error(path, e))?;
    rustls_pemfile::private_key(&mut data.as_slice())
        .map_err(|e| read_error(path, e))?
        .ok_or_else(|| TlsConfigError::MissingKey(path.display().to_string()))
}

/// Bidirectional byte stream behind an accepted connection.
#[derive(Debug)]
pub enum TransportStream {
    /// Plain TCP.
    Plain(TcpStream),
    /// TLS over TCP, server side.
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for TransportStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for TransportStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_flush(cx),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cert_file_is_a_read_error() {
        let err = load_tls_config(
            Path::new("/nonexistent/cert.pem"),
            Path::new("/nonexistent/key.pem"),
        )
        .expect_err("must fail");
        assert!(matches!(err, TlsConfigError::Read { .. }));
    }

    #[test]
    fn key_file_without_key_is_rejected() {
        let dir = std::env::temp_dir().join(format!("pktstream-tls-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create dir");
        let cert = dir.join("cert.pem");
        let key = dir.join("key.pem");
        // Parseable PEM with no private key inside.
        std::fs::write(&cert, "").expect("write cert");
        std::fs::write(&key, "").expect("write key");

        let err = load_tls_config(&cert, &key).expect_err("must fail");
        assert!(matches!(err, TlsConfigError::MissingKey(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
