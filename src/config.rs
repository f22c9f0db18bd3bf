//! Receiver configuration surface.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Bytes per kilobyte of configured frame buffer.
pub const KILOBYTE: usize = 1024;

/// Default maximum frame buffer size in kilobytes.
pub const DEFAULT_MAX_FRAME_KB: usize = 64;

/// TLS settings for the listener.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TlsSettings {
    /// Path to the PEM server certificate chain.
    pub cert_path: PathBuf,
    /// Path to the PEM private key.
    pub key_path: PathBuf,
}

/// Configuration consumed by the receiver.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReceiverConfig {
    /// Address to listen on; combined with `port` when one is set,
    /// otherwise used verbatim as the listen address.
    pub address: String,
    /// Optional port appended to `address`.
    #[serde(default)]
    pub port: Option<u16>,
    /// Maximum frame buffer size in kilobytes, header included.
    #[serde(default = "default_max_frame_kb")]
    pub max_frame_kb: usize,
    /// Enable TLS on the listener when set.
    #[serde(default)]
    pub tls: Option<TlsSettings>,
    /// Require the authentication handshake before streaming.
    #[serde(default)]
    pub auth_enabled: bool,
}

fn default_max_frame_kb() -> usize {
    DEFAULT_MAX_FRAME_KB
}

impl ReceiverConfig {
    /// Configuration with defaults for everything but the address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port: None,
            max_frame_kb: DEFAULT_MAX_FRAME_KB,
            tls: None,
            auth_enabled: false,
        }
    }

    /// Listen address handed to the listener.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{port}", self.address),
            None => self.address.clone(),
        }
    }

    /// Maximum frame buffer size in bytes.
    #[must_use]
    pub const fn max_frame_bytes(&self) -> usize {
        self.max_frame_kb * KILOBYTE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_is_appended_when_present() {
        let mut config = ReceiverConfig::new("127.0.0.1");
        assert_eq!(config.listen_addr(), "127.0.0.1");
        config.port = Some(8081);
        assert_eq!(config.listen_addr(), "127.0.0.1:8081");
    }

    #[test]
    fn frame_buffer_is_sized_in_kilobytes() {
        let config = ReceiverConfig::new("0.0.0.0");
        assert_eq!(config.max_frame_bytes(), DEFAULT_MAX_FRAME_KB * 1024);
    }
}
