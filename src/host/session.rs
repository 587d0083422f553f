use super::reporter::ErrorReporter;
use crate::config::ReplayConfig;
use crate::error::{Result, ReplayError};
use crate::pacing::{PacingConfig, PlaybackSummary, ReplayEngine};
use crate::transport::{
    Connection, Endpoint, Protocol, TcpSink, TransportStats, UdpSink, MAX_DATAGRAM_PAYLOAD,
};
use chrono::{DateTime, Utc};
use log::info;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of streaming one file over a session.
#[derive(Debug, Clone)]
pub struct StreamReport {
    pub summary: PlaybackSummary,
    /// Transport counter growth attributable to this playback.
    pub traffic: TransportStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// A connection to one endpoint plus the engine that feeds it.
///
/// The socket is released by [`Session::close`] or when the last clone of
/// the session's connection is dropped.
pub struct Session {
    endpoint: Endpoint,
    connection: Arc<dyn Connection>,
    engine: ReplayEngine,
    reporter: Arc<dyn ErrorReporter>,
}

impl Session {
    /// Connects to `config.endpoint`. Failures are reported and returned.
    pub async fn connect(config: &ReplayConfig, reporter: Arc<dyn ErrorReporter>) -> Result<Self> {
        let result = Self::open(config).await;
        match result {
            Ok((endpoint, connection)) => Ok(Self::with_connection(
                endpoint,
                connection,
                config.pacing(),
                reporter,
            )),
            Err(e) => {
                reporter.report("connection error", &e);
                Err(e)
            }
        }
    }

    async fn open(config: &ReplayConfig) -> Result<(Endpoint, Arc<dyn Connection>)> {
        config.validate()?;
        let endpoint = Endpoint::parse(&config.endpoint)?;
        let connection: Arc<dyn Connection> = match endpoint.protocol {
            Protocol::Udp => {
                if config.chunk_size > MAX_DATAGRAM_PAYLOAD {
                    return Err(ReplayError::Config(format!(
                        "chunk_size {} does not fit in one UDP datagram (max {})",
                        config.chunk_size, MAX_DATAGRAM_PAYLOAD
                    )));
                }
                Arc::new(UdpSink::connect(&endpoint).await?)
            }
            Protocol::Tcp => Arc::new(TcpSink::connect(&endpoint).await?),
        };
        Ok((endpoint, connection))
    }

    /// Builds a session over an already established connection.
    pub fn with_connection(
        endpoint: Endpoint,
        connection: Arc<dyn Connection>,
        pacing: PacingConfig,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            endpoint,
            connection,
            engine: ReplayEngine::new(pacing),
            reporter,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn stats(&self) -> TransportStats {
        self.connection.stats()
    }

    /// Streams `path` in real time and returns the traffic it produced.
    pub async fn stream_file<P: AsRef<Path>>(
        &self,
        path: P,
        cancel: &CancellationToken,
    ) -> Result<StreamReport> {
        let started_at = Utc::now();
        let before = self.connection.stats();
        let result = self
            .engine
            .stream_file(path.as_ref(), &*self.connection, cancel)
            .await;
        let traffic = self.connection.stats().delta(&before);

        info!(
            "{}: sent {} bytes, retransmitted {} bytes",
            self.endpoint, traffic.bytes_sent, traffic.bytes_retransmitted
        );

        match result {
            Ok(summary) => Ok(StreamReport {
                summary,
                traffic,
                started_at,
                finished_at: Utc::now(),
            }),
            Err(e) => {
                self.reporter.report("error streaming mpegts file", &e);
                Err(e)
            }
        }
    }

    /// Reads and drops `n` bytes received on the session.
    pub async fn discard(&self, n: u64) -> Result<u64> {
        self.connection.discard(n).await.inspect_err(|e| {
            self.reporter.report("error discarding received data", e);
        })
    }

    pub async fn close(&self) -> Result<()> {
        info!("Closing session to {}", self.endpoint);
        self.connection.close().await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("engine", &self.engine)
            .finish()
    }
}
