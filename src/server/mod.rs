//! Receiver runtime: transport acceptance and pipeline fan-out.
//!
//! A [`Receiver`] owns the configuration and the collaborator seams (output
//! sink, decompressor, authenticator). Binding it yields a
//! [`BoundReceiver`] whose `run` spawns the singleton writer and sampler
//! tasks plus one accept loop, then one read pipeline and one decompression
//! stage per accepted connection. All cross-task communication is
//! queue-mediated; errors never cross task boundaries as values.

mod accept;
pub mod error;

use std::{io, net::SocketAddr, sync::Arc};

use std::future::Future;

use tokio::{net::TcpListener, select, signal};
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;

use accept::ConnectionShared;
pub use error::ReceiverError;

use crate::{
    auth::Authenticator,
    config::{KILOBYTE, ReceiverConfig},
    decompress::{Decompress, ZstdDecompressor},
    lossy,
    sink::{self, OutputSink, StdoutSink},
    throughput::ThroughputSampler,
    tls::load_tls_config,
};

/// Capacity of each per-connection frame queue and the shared size queue.
pub(crate) const FRAME_QUEUE_CAPACITY: usize = 100;

/// Capacity of the shared output queue.
pub(crate) const OUTPUT_QUEUE_CAPACITY: usize = FRAME_QUEUE_CAPACITY * 10;

/// Streaming receiver, not yet bound to a listener.
pub struct Receiver {
    config: ReceiverConfig,
    sink: Box<dyn OutputSink>,
    decompressor: Arc<dyn Decompress>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl Receiver {
    /// Receiver writing to stdout with zstd decompression and no
    /// authenticator.
    #[must_use]
    pub fn new(config: ReceiverConfig) -> Self {
        Self {
            config,
            sink: Box::new(StdoutSink::new()),
            decompressor: Arc::new(ZstdDecompressor),
            authenticator: None,
        }
    }

    /// Replace the output destination.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the decompression collaborator.
    #[must_use]
    pub fn with_decompressor(mut self, decompressor: Arc<dyn Decompress>) -> Self {
        self.decompressor = decompressor;
        self
    }

    /// Install the authentication handshake.
    ///
    /// Required when the configuration enables authentication.
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Bind the listener and load the TLS configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiverError`] when the bind fails, the TLS material is
    /// unusable, the frame size is unusable, or authentication is enabled
    /// without an authenticator. All of these are fatal: the receiver never
    /// serves.
    pub async fn bind(self) -> Result<BoundReceiver, ReceiverError> {
        // Every connection allocates a buffer of this size and slices the
        // header out of it, so it must be nonzero and fit the wire's u32
        // length field.
        let kb = self.config.max_frame_kb;
        if kb == 0
            || kb
                .checked_mul(KILOBYTE)
                .is_none_or(|bytes| u32::try_from(bytes).is_err())
        {
            return Err(ReceiverError::FrameSize { kb });
        }
        if self.config.auth_enabled && self.authenticator.is_none() {
            return Err(ReceiverError::MissingAuthenticator);
        }
        let tls = match &self.config.tls {
            Some(settings) => {
                let config = load_tls_config(&settings.cert_path, &settings.key_path)?;
                Some(TlsAcceptor::from(Arc::new(config)))
            }
            None => None,
        };
        let listener = TcpListener::bind(self.config.listen_addr()).await?;
        Ok(BoundReceiver {
            listener,
            tls,
            inner: self,
        })
    }
}

/// A [`Receiver`] bound to its listener and ready to serve.
pub struct BoundReceiver {
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    inner: Receiver,
}

impl std::fmt::Debug for BoundReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundReceiver")
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

impl BoundReceiver {
    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Propagates the listener's own failure to report its address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until Ctrl+C.
    pub async fn run(self) {
        self.run_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await;
    }

    /// Serve until `shutdown` resolves or the listener fails.
    ///
    /// Returning stops accepting new connections. Pipelines already running
    /// keep draining on their own tasks; the writer and sampler terminate
    /// once the last producer of their queue is gone.
    pub async fn run_with_shutdown<S>(self, shutdown: S)
    where
        S: Future<Output = ()> + Send,
    {
        let (output_tx, output_rx) = lossy::channel(OUTPUT_QUEUE_CAPACITY, "output");
        let (size_tx, size_rx) = lossy::channel(FRAME_QUEUE_CAPACITY, "size");

        tokio::spawn(sink::run(output_rx, self.inner.sink));
        tokio::spawn(ThroughputSampler::new(size_rx).run());

        // The gate only runs when the configuration enables it; an installed
        // authenticator on its own does nothing.
        let authenticator = self
            .inner
            .config
            .auth_enabled
            .then_some(self.inner.authenticator)
            .flatten();
        let shared = Arc::new(ConnectionShared {
            max_frame_bytes: self.inner.config.max_frame_bytes(),
            authenticator,
            decompressor: self.inner.decompressor,
            output: output_tx,
            sizes: size_tx,
        });
        let token = CancellationToken::new();
        let mut acceptor = tokio::spawn(accept::accept_loop(
            self.listener,
            self.tls,
            shared,
            token.clone(),
        ));

        select! {
            () = shutdown => token.cancel(),
            // The accept loop ended on its own: listener failure. Live
            // connections keep draining on their detached tasks.
            _ = &mut acceptor => return,
        }
        let _ = acceptor.await;
    }
}
