//! # Sinks
//!
//! A [`Sink`] accepts one whole chunk per call and exposes cumulative
//! [`TransportStats`] so callers can attribute traffic to a playback by
//! taking snapshots before and after it.
//!
//! Two socket-backed sinks are provided: [`UdpSink`] sends each chunk as
//! one datagram, [`TcpSink`] writes each chunk in full to a stream.
//! [`Endpoint`] parses the `udp://host:port` / `tcp://host:port` form
//! used to pick between them.

use crate::error::{Result, ReplayError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

/// TCP stream sink
pub mod tcp;

/// UDP datagram sink
pub mod udp;

pub use tcp::TcpSink;
pub use udp::{UdpSink, MAX_DATAGRAM_PAYLOAD};

/// Destination for paced chunks.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Writes the whole chunk in one operation.
    ///
    /// Accepting fewer bytes than `chunk.len()` is an error; callers do not
    /// retry or resume partial writes.
    async fn write_chunk(&self, chunk: &[u8]) -> Result<()>;

    /// Snapshot of the cumulative transport counters.
    fn stats(&self) -> TransportStats;
}

/// A connected sink that can also be read from and closed.
#[async_trait]
pub trait Connection: Sink {
    /// Reads and drops `n` received bytes, returning how many were consumed.
    ///
    /// Datagram transports consume whole datagrams, so the result can
    /// exceed `n`.
    async fn discard(&self, n: u64) -> Result<u64>;

    /// Releases the underlying socket. Later writes fail.
    async fn close(&self) -> Result<()>;
}

/// Point-in-time copy of a sink's counters.
///
/// `bytes_retransmitted` and `bytes_receive_lost` are filled in only by sinks
/// whose protocol reports them; [`UdpSink`] and [`TcpSink`] leave them at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub bytes_retransmitted: u64,
    pub bytes_receive_lost: u64,
}

impl TransportStats {
    /// Counter growth since `before`.
    pub fn delta(&self, before: &TransportStats) -> TransportStats {
        TransportStats {
            bytes_sent: self.bytes_sent.saturating_sub(before.bytes_sent),
            bytes_received: self.bytes_received.saturating_sub(before.bytes_received),
            bytes_retransmitted: self
                .bytes_retransmitted
                .saturating_sub(before.bytes_retransmitted),
            bytes_receive_lost: self
                .bytes_receive_lost
                .saturating_sub(before.bytes_receive_lost),
        }
    }
}

/// Monotonic counters shared between a sink and its readers.
#[derive(Debug, Default)]
pub struct StatsCounters {
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    bytes_retransmitted: AtomicU64,
    bytes_receive_lost: AtomicU64,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sent(&self, n: usize) {
        self.bytes_sent.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn add_received(&self, n: usize) {
        self.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// For sinks over protocols with their own recovery layer.
    pub fn add_retransmitted(&self, n: usize) {
        self.bytes_retransmitted.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn add_receive_lost(&self, n: usize) {
        self.bytes_receive_lost.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TransportStats {
        TransportStats {
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_retransmitted: self.bytes_retransmitted.load(Ordering::Relaxed),
            bytes_receive_lost: self.bytes_receive_lost.load(Ordering::Relaxed),
        }
    }
}

/// Transport protocol of an [`Endpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Udp,
    Tcp,
}

/// Parsed `scheme://host:port` destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn parse(endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint)
            .map_err(|e| ReplayError::Connection(format!("invalid endpoint {}: {}", endpoint, e)))?;

        let protocol = match url.scheme() {
            "udp" => Protocol::Udp,
            "tcp" => Protocol::Tcp,
            other => {
                return Err(ReplayError::Connection(format!(
                    "unsupported endpoint scheme: {}",
                    other
                )))
            }
        };

        let host = url
            .host_str()
            .ok_or_else(|| ReplayError::Connection("No host in endpoint".into()))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = url
            .port()
            .ok_or_else(|| ReplayError::Connection("No port in endpoint".into()))?;

        Ok(Self {
            protocol,
            host,
            port,
        })
    }

    /// `host:port` form accepted by tokio's address resolution.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = match self.protocol {
            Protocol::Udp => "udp",
            Protocol::Tcp => "tcp",
        };
        write!(f, "{}://{}", scheme, self.address())
    }
}
