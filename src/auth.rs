//! Authentication gate run before a connection's pipeline starts.
//!
//! When authentication is enabled, every accepted connection goes through a
//! handshake before any queue or pipeline exists for it. Rejection simply
//! drops the connection; there is no retry and nothing downstream ever
//! learns the connection existed. The handshake runs concurrently with the
//! accept loop, so a slow or hostile peer cannot delay other connections.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::tls::TransportStream;

/// Byte sent back to the peer on an accepted handshake.
const ACCEPT: u8 = 0x01;
/// Byte sent back to the peer on a rejected handshake.
const REJECT: u8 = 0x00;

/// Longest key a peer may present, bounding the handshake read.
const MAX_KEY_LEN: usize = 1024;

/// Handshake collaborator deciding whether a connection may stream.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Perform the handshake; `Ok(true)` admits the connection.
    ///
    /// # Errors
    ///
    /// An I/O failure during the handshake rejects the connection the same
    /// way a refusal does.
    async fn authenticate(&self, stream: &mut TransportStream) -> io::Result<bool>;
}

/// Authenticator comparing a length-prefixed key from the peer against a
/// configured secret.
///
/// The peer sends a two-byte little-endian key length followed by the key;
/// the gate answers with a single accept or reject byte. This carries no
/// cryptographic weight on its own and is intended to run over TLS.
#[derive(Clone, Debug)]
pub struct PresharedKeyAuthenticator {
    key: Vec<u8>,
}

impl PresharedKeyAuthenticator {
    #[must_use]
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl Authenticator for PresharedKeyAuthenticator {
    async fn authenticate(&self, stream: &mut TransportStream) -> io::Result<bool> {
        let len = usize::from(stream.read_u16_le().await?);
        if len > MAX_KEY_LEN {
            stream.write_u8(REJECT).await?;
            return Ok(false);
        }
        let mut presented = vec![0u8; len];
        stream.read_exact(&mut presented).await?;
        let accepted = presented == self.key;
        stream
            .write_u8(if accepted { ACCEPT } else { REJECT })
            .await?;
        Ok(accepted)
    }
}

/// Client half of the preshared-key handshake, for senders and tests.
///
/// # Errors
///
/// Propagates I/O failures; returns `Ok(false)` when the receiver rejects
/// the key.
pub async fn present_key(stream: &mut TransportStream, key: &[u8]) -> io::Result<bool> {
    let len = u16::try_from(key.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "key too long"))?;
    stream.write_u16_le(len).await?;
    stream.write_all(key).await?;
    stream.flush().await?;
    Ok(stream.read_u8().await? == ACCEPT)
}
