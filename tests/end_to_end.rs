//! End-to-end receiver tests over loopback TCP.

use std::{
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use pktstream::{
    Receiver, ReceiverConfig, ReceiverError, encode_frame,
    auth::{Authenticator, PresharedKeyAuthenticator, present_key},
    decompress::{self, Decompress, DecompressError, ZstdDecompressor},
    sink::{OutputSink, SinkError},
    tls::TransportStream,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::oneshot,
};

/// Sink capturing every payload for assertions.
#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<Vec<Vec<u8>>>>);

impl RecordingSink {
    fn written(&self) -> Vec<Vec<u8>> {
        self.0.lock().expect("lock").clone()
    }
}

#[async_trait]
impl OutputSink for RecordingSink {
    async fn write(&mut self, payload: &[u8]) -> Result<(), SinkError> {
        self.0.lock().expect("lock").push(payload.to_vec());
        Ok(())
    }
}

/// Decompressor counting invocations before delegating to zstd.
struct CountingDecompressor {
    calls: Arc<AtomicUsize>,
}

impl Decompress for CountingDecompressor {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecompressError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ZstdDecompressor.decompress(data)
    }
}

/// Authenticator refusing every connection.
struct RejectAll;

#[async_trait]
impl Authenticator for RejectAll {
    async fn authenticate(&self, _stream: &mut TransportStream) -> io::Result<bool> {
        Ok(false)
    }
}

struct Running {
    addr: std::net::SocketAddr,
    sink: RecordingSink,
    stop: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

async fn start_receiver(
    configure: impl FnOnce(Receiver) -> Receiver,
) -> Result<Running, ReceiverError> {
    start_receiver_with(ReceiverConfig::new("127.0.0.1:0"), configure).await
}

async fn start_receiver_with(
    config: ReceiverConfig,
    configure: impl FnOnce(Receiver) -> Receiver,
) -> Result<Running, ReceiverError> {
    let sink = RecordingSink::default();
    let receiver = configure(Receiver::new(config).with_sink(Box::new(sink.clone())));
    let bound = receiver.bind().await?;
    let addr = bound.local_addr().expect("local addr");
    let (stop, stop_rx) = oneshot::channel();
    let task = tokio::spawn(bound.run_with_shutdown(async {
        let _ = stop_rx.await;
    }));
    Ok(Running {
        addr,
        sink,
        stop,
        task,
    })
}

async fn wait_for_output(sink: &RecordingSink, expected: usize) -> Vec<Vec<u8>> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let written = sink.written();
            if written.len() >= expected {
                return written;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for output")
}

#[tokio::test]
async fn plain_frame_reaches_the_sink_verbatim() {
    let running = start_receiver(|r| r).await.expect("start receiver");

    let mut client = TcpStream::connect(running.addr).await.expect("connect");
    let frame = encode_frame(b"abc", false).expect("encode");
    client.write_all(&frame).await.expect("write");
    client.flush().await.expect("flush");

    let written = wait_for_output(&running.sink, 1).await;
    assert_eq!(written, vec![b"abc".to_vec()]);

    drop(client);
    let _ = running.stop.send(());
    running.task.await.expect("receiver task");
}

#[tokio::test]
async fn compressed_frame_is_decoded_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let running = start_receiver(move |r| {
        r.with_decompressor(Arc::new(CountingDecompressor { calls: counter }))
    })
    .await
    .expect("start receiver");

    let compressed = decompress::compress(b"hello").expect("compress");
    let mut client = TcpStream::connect(running.addr).await.expect("connect");
    let frame = encode_frame(&compressed, true).expect("encode");
    client.write_all(&frame).await.expect("write");

    let written = wait_for_output(&running.sink, 1).await;
    assert_eq!(written, vec![b"hello".to_vec()]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    drop(client);
    let _ = running.stop.send(());
    running.task.await.expect("receiver task");
}

#[tokio::test]
async fn rejected_connection_never_reaches_the_sink() {
    let mut config = ReceiverConfig::new("127.0.0.1:0");
    config.auth_enabled = true;
    let running = start_receiver_with(config, |r| r.with_authenticator(Arc::new(RejectAll)))
        .await
        .expect("start receiver");

    let mut client = TcpStream::connect(running.addr).await.expect("connect");
    let frame = encode_frame(b"abc", false).expect("encode");
    let _ = client.write_all(&frame).await;

    let mut buf = [0u8; 1];
    let n = tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf))
        .await
        .expect("timed out waiting for close")
        .expect("read");
    assert_eq!(n, 0, "receiver should close a rejected connection");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(running.sink.written().is_empty());

    let _ = running.stop.send(());
    running.task.await.expect("receiver task");
}

#[tokio::test]
async fn preshared_key_handshake_admits_matching_clients() {
    let mut config = ReceiverConfig::new("127.0.0.1:0");
    config.auth_enabled = true;
    let running = start_receiver_with(config, |r| {
        r.with_authenticator(Arc::new(PresharedKeyAuthenticator::new(&b"s3cret"[..])))
    })
    .await
    .expect("start receiver");

    let client = TcpStream::connect(running.addr).await.expect("connect");
    let mut client = TransportStream::Plain(client);
    let admitted = present_key(&mut client, b"s3cret").await.expect("handshake");
    assert!(admitted);

    let frame = encode_frame(b"after auth", false).expect("encode");
    client.write_all(&frame).await.expect("write");

    let written = wait_for_output(&running.sink, 1).await;
    assert_eq!(written, vec![b"after auth".to_vec()]);

    drop(client);
    let _ = running.stop.send(());
    running.task.await.expect("receiver task");
}

#[tokio::test]
async fn wrong_preshared_key_is_rejected() {
    let mut config = ReceiverConfig::new("127.0.0.1:0");
    config.auth_enabled = true;
    let running = start_receiver_with(config, |r| {
        r.with_authenticator(Arc::new(PresharedKeyAuthenticator::new(&b"s3cret"[..])))
    })
    .await
    .expect("start receiver");

    let client = TcpStream::connect(running.addr).await.expect("connect");
    let mut client = TransportStream::Plain(client);
    let admitted = present_key(&mut client, b"wrong").await.expect("handshake");
    assert!(!admitted);

    let _ = running.stop.send(());
    running.task.await.expect("receiver task");
}

#[tokio::test]
async fn auth_enabled_without_authenticator_fails_at_bind() {
    let mut config = ReceiverConfig::new("127.0.0.1:0");
    config.auth_enabled = true;
    let err = Receiver::new(config).bind().await.expect_err("must fail");
    assert!(matches!(err, ReceiverError::MissingAuthenticator));
}

#[tokio::test]
async fn unusable_frame_size_fails_at_bind() {
    // Zero allocates no buffer at all; usize::MAX overflows the kilobyte
    // multiplication and could never fit the wire's u32 length field.
    for kb in [0, usize::MAX] {
        let mut config = ReceiverConfig::new("127.0.0.1:0");
        config.max_frame_kb = kb;
        let err = Receiver::new(config).bind().await.expect_err("must fail");
        assert!(matches!(err, ReceiverError::FrameSize { .. }));
    }
}

#[tokio::test]
async fn frames_from_one_connection_stay_ordered() {
    let running = start_receiver(|r| r).await.expect("start receiver");

    let mut client = TcpStream::connect(running.addr).await.expect("connect");
    for payload in [&b"one"[..], b"two", b"three"] {
        let frame = encode_frame(payload, false).expect("encode");
        client.write_all(&frame).await.expect("write");
    }

    let written = wait_for_output(&running.sink, 3).await;
    assert_eq!(
        written,
        vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
    );

    drop(client);
    let _ = running.stop.send(());
    running.task.await.expect("receiver task");
}
