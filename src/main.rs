//! Receiver binary for the packet streaming protocol.
//!
//! Parses CLI arguments into a [`ReceiverConfig`], wires the requested
//! output sink and collaborators, and serves until Ctrl+C.

mod cli;

use std::sync::Arc;

use clap::Parser;
use pktstream::{
    ReceiverConfig,
    auth::PresharedKeyAuthenticator,
    config::TlsSettings,
    server::Receiver,
    sink::FileSink,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    let mut config = ReceiverConfig::new(cli.address);
    config.port = cli.port;
    config.max_frame_kb = cli.max_frame_kb;
    config.auth_enabled = cli.auth_key.is_some();
    if cli.tls
        && let (Some(cert_path), Some(key_path)) = (cli.cert, cli.key)
    {
        config.tls = Some(TlsSettings {
            cert_path,
            key_path,
        });
    }

    let mut receiver = Receiver::new(config);
    if let Some(key) = cli.auth_key {
        receiver = receiver.with_authenticator(Arc::new(PresharedKeyAuthenticator::new(key)));
    }
    if let Some(path) = cli.output {
        receiver = receiver.with_sink(Box::new(FileSink::open(&path).await?));
    }

    receiver.bind().await?.run().await;
    Ok(())
}
