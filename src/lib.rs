//! Receiver for a binary packet-streaming protocol.
//!
//! Remote senders stream captured-packet payloads, optionally compressed,
//! as magic-prefixed length-delimited frames over TCP or TLS. This crate
//! terminates the transport, validates the framing byte-exactly, optionally
//! gates connections behind an authentication handshake, and feeds frames
//! through a decoupled decompression/output pipeline built entirely on
//! bounded drop-on-full queues: under overload the receiver sheds frames
//! rather than stalling its read or accept loops.
//!
//! Data flow: acceptor → (auth gate) → per-connection read pipeline →
//! frame queue → per-connection decompression stage → shared output queue →
//! output sink writer, with byte counts reported independently to a
//! throughput sampler.

pub mod auth;
pub mod config;
pub mod connection;
pub mod decompress;
pub mod frame;
pub mod lossy;
pub mod reader;
pub mod server;
pub mod sink;
pub mod throughput;
pub mod tls;

pub use config::ReceiverConfig;
pub use frame::{Frame, FrameError, FrameHeader, HEADER_LEN, MAGIC, encode_frame};
pub use server::{BoundReceiver, Receiver, ReceiverError};
