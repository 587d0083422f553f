use super::{Connection, Endpoint, Sink, StatsCounters, TransportStats};
use crate::error::{Result, ReplayError};
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{lookup_host, UdpSocket};

const MAX_DATAGRAM_SIZE: usize = 65_536;

/// Largest chunk that fits in a single IPv4 UDP datagram.
pub const MAX_DATAGRAM_PAYLOAD: usize = 65_507;

/// Sends each chunk as a single datagram to a connected peer.
///
/// Only sent and received bytes are counted; plain UDP has no
/// retransmission or loss accounting.
#[derive(Debug)]
pub struct UdpSink {
    socket: Mutex<Option<Arc<UdpSocket>>>,
    peer: SocketAddr,
    counters: StatsCounters,
}

impl UdpSink {
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let addr = endpoint.address();
        let peer = lookup_host(&addr)
            .await
            .map_err(|e| ReplayError::Connection(format!("Failed to resolve {}: {}", addr, e)))?
            .next()
            .ok_or_else(|| ReplayError::Connection(format!("No address for {}", addr)))?;

        let local: SocketAddr = if peer.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket
            .connect(peer)
            .await
            .map_err(|e| ReplayError::Connection(format!("Failed to connect to {}: {}", peer, e)))?;

        info!("UDP sink connected to {}", peer);
        Ok(Self {
            socket: Mutex::new(Some(Arc::new(socket))),
            peer,
            counters: StatsCounters::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket()?.local_addr()?)
    }

    fn socket(&self) -> Result<Arc<UdpSocket>> {
        self.socket
            .lock()
            .clone()
            .ok_or_else(|| std::io::Error::new(ErrorKind::NotConnected, "socket closed").into())
    }
}

#[async_trait]
impl Sink for UdpSink {
    async fn write_chunk(&self, chunk: &[u8]) -> Result<()> {
        let socket = self.socket()?;
        let sent = socket.send(chunk).await?;
        if sent != chunk.len() {
            return Err(std::io::Error::new(
                ErrorKind::WriteZero,
                format!("short datagram write: {} of {} bytes", sent, chunk.len()),
            )
            .into());
        }
        self.counters.add_sent(sent);
        Ok(())
    }

    fn stats(&self) -> TransportStats {
        self.counters.snapshot()
    }
}

#[async_trait]
impl Connection for UdpSink {
    async fn discard(&self, n: u64) -> Result<u64> {
        let socket = self.socket()?;
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut consumed = 0u64;
        while consumed < n {
            let len = socket.recv(&mut buf).await?;
            self.counters.add_received(len);
            consumed += len as u64;
        }
        debug!("Discarded {} bytes from {}", consumed, self.peer);
        Ok(consumed)
    }

    async fn close(&self) -> Result<()> {
        if self.socket.lock().take().is_some() {
            debug!("UDP sink to {} closed", self.peer);
        }
        Ok(())
    }
}
