//! Command line interface for the pktstream receiver binary.

use std::path::PathBuf;

use clap::Parser;

/// Command line arguments for the `pktstream` binary.
#[derive(Debug, Parser)]
#[command(
    name = "pktstream",
    version,
    about = "Receiver for the packet streaming protocol"
)]
pub struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    pub address: String,

    /// Port to listen on; omit to use `address` verbatim.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Maximum frame buffer size in kilobytes.
    #[arg(long, default_value_t = 64)]
    pub max_frame_kb: usize,

    /// Enable TLS on the listener.
    #[arg(long, requires = "cert", requires = "key")]
    pub tls: bool,

    /// Path to the PEM server certificate chain.
    #[arg(long)]
    pub cert: Option<PathBuf>,

    /// Path to the PEM private key.
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// Require the preshared-key handshake before streaming.
    #[arg(long, value_name = "KEY")]
    pub auth_key: Option<String>,

    /// Append output to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
