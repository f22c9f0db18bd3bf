//! Accept loop and per-connection fan-out.

use std::sync::Arc;

use bytes::Bytes;
use log::{info, warn};
use tokio::{
    net::{TcpListener, TcpStream},
    select,
};
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;

use crate::{
    auth::Authenticator,
    connection,
    decompress::{self, Decompress},
    frame::Frame,
    lossy::{self, LossySender},
    tls::TransportStream,
};

use super::FRAME_QUEUE_CAPACITY;

/// State shared by every connection spawned from one accept loop.
pub(super) struct ConnectionShared {
    pub max_frame_bytes: usize,
    pub authenticator: Option<Arc<dyn Authenticator>>,
    pub decompressor: Arc<dyn Decompress>,
    pub output: LossySender<Bytes>,
    pub sizes: LossySender<usize>,
}

/// Accept connections until the listener fails or shutdown is requested.
///
/// Each accepted connection gets its own task for transport setup, the
/// optional auth gate and the read pipeline, so nothing here ever waits on
/// a peer. A listener failure ends only this loop; connections already
/// running are unaffected until they independently fail.
pub(super) async fn accept_loop(
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    shared: Arc<ConnectionShared>,
    shutdown: CancellationToken,
) {
    loop {
        select! {
            biased;

            () = shutdown.cancelled() => return,
            res = listener.accept() => match res {
                Ok((stream, peer)) => {
                    info!("accepted connection on socket: peer={peer}");
                    spawn_connection(stream, peer, tls.clone(), Arc::clone(&shared));
                }
                Err(e) => {
                    warn!("unable to accept connections on socket: error={e}");
                    return;
                }
            },
        }
    }
}

fn spawn_connection(
    stream: TcpStream,
    peer: std::net::SocketAddr,
    tls: Option<TlsAcceptor>,
    shared: Arc<ConnectionShared>,
) {
    tokio::spawn(async move {
        let mut stream = match tls {
            Some(acceptor) => match acceptor.accept(stream).await {
                Ok(s) => TransportStream::Tls(Box::new(s)),
                Err(e) => {
                    warn!("TLS handshake failed: peer={peer}, error={e}");
                    return;
                }
            },
            None => TransportStream::Plain(stream),
        };

        if let Some(auth) = &shared.authenticator {
            match auth.authenticate(&mut stream).await {
                Ok(true) => {}
                Ok(false) => {
                    info!("authentication rejected: peer={peer}");
                    return;
                }
                Err(e) => {
                    warn!("authentication handshake failed: peer={peer}, error={e}");
                    return;
                }
            }
        }

        let (frame_tx, frame_rx) = lossy::channel::<Frame>(FRAME_QUEUE_CAPACITY, "uncompress");
        tokio::spawn(decompress::run(
            frame_rx,
            shared.output.clone(),
            Arc::clone(&shared.decompressor),
        ));
        connection::run(
            stream,
            peer,
            shared.max_frame_bytes,
            frame_tx,
            shared.sizes.clone(),
        )
        .await;
    });
}
