use super::{Connection, Endpoint, Sink, StatsCounters, TransportStats};
use crate::error::{Result, ReplayError};
use async_trait::async_trait;
use log::{debug, info};
use std::io::ErrorKind;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Writes each chunk in full to a TCP stream.
///
/// Retransmission happens inside the kernel and is not visible here, so
/// only sent and received bytes are counted.
#[derive(Debug)]
pub struct TcpSink {
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    peer: SocketAddr,
    counters: StatsCounters,
}

impl TcpSink {
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let addr = endpoint.address();
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| ReplayError::Connection(format!("Failed to connect to {}: {}", addr, e)))?;

        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        let (reader, writer) = stream.into_split();

        info!("TCP sink connected to {}", peer);
        Ok(Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(Some(writer)),
            peer,
            counters: StatsCounters::new(),
        })
    }
}

fn closed() -> ReplayError {
    std::io::Error::new(ErrorKind::NotConnected, "socket closed").into()
}

#[async_trait]
impl Sink for TcpSink {
    async fn write_chunk(&self, chunk: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let stream = writer.as_mut().ok_or_else(closed)?;
        stream.write_all(chunk).await?;
        self.counters.add_sent(chunk.len());
        Ok(())
    }

    fn stats(&self) -> TransportStats {
        self.counters.snapshot()
    }
}

#[async_trait]
impl Connection for TcpSink {
    async fn discard(&self, n: u64) -> Result<u64> {
        if self.writer.lock().await.is_none() {
            return Err(closed());
        }

        let mut reader = self.reader.lock().await;
        let mut buf = [0u8; 4096];
        let mut consumed = 0u64;
        while consumed < n {
            let want = (n - consumed).min(buf.len() as u64) as usize;
            let len = reader.read(&mut buf[..want]).await?;
            if len == 0 {
                return Err(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("Connection closed by peer after {} of {} bytes", consumed, n),
                )
                .into());
            }
            self.counters.add_received(len);
            consumed += len as u64;
        }
        debug!("Discarded {} bytes from {}", consumed, self.peer);
        Ok(consumed)
    }

    async fn close(&self) -> Result<()> {
        if let Some(mut writer) = self.writer.lock().await.take() {
            writer.shutdown().await?;
            debug!("TCP sink to {} closed", self.peer);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::net::TcpListener;

    async fn listener() -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let endpoint = Endpoint::parse(&format!("tcp://127.0.0.1:{}", port)).unwrap();
        (listener, endpoint)
    }

    #[tokio::test]
    async fn test_write_and_discard() {
        let (listener, endpoint) = listener().await;
        let sink = TcpSink::connect(&endpoint).await.unwrap();
        let (mut peer, _) = listener.accept().await.unwrap();

        sink.write_chunk(&[0x47u8; 376]).await.unwrap();
        let mut buf = vec![0u8; 376];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(sink.stats().bytes_sent, 376);

        peer.write_all(&[9u8; 64]).await.unwrap();
        assert_eq!(sink.discard(64).await.unwrap(), 64);
        assert_eq!(sink.stats().bytes_received, 64);
    }

    #[tokio::test]
    async fn test_close_shuts_down_stream() {
        let (listener, endpoint) = listener().await;
        let sink = TcpSink::connect(&endpoint).await.unwrap();
        let (mut peer, _) = listener.accept().await.unwrap();

        sink.close().await.unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
        assert!(sink.write_chunk(&[0x47u8; 188]).await.is_err());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let (listener, endpoint) = listener().await;
        drop(listener);
        let err = TcpSink::connect(&endpoint).await.unwrap_err();
        assert!(matches!(err, ReplayError::Connection(_)));
    }
}
