use super::clock::{ClockEvent, ClockState, DiscontinuityWindow};
use super::scheduler::{Scheduler, WaitOutcome};
use crate::error::Result;
use crate::format::ts::{ChunkReader, PcrScan, TSPacketParser, TS_PACKET_SIZE};
use crate::transport::Sink;
use log::{debug, info, warn};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default read/write granularity: 7 packets, one typical live-TS datagram.
pub const DEFAULT_CHUNK_SIZE: usize = 7 * TS_PACKET_SIZE;

/// Settings for one playback run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    pub chunk_size: usize,
    pub window: DiscontinuityWindow,
    pub pcr_scan: PcrScan,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            window: DiscontinuityWindow::default(),
            pcr_scan: PcrScan::LastPacket,
        }
    }
}

/// How a playback run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// End of stream reached; every chunk was written.
    Completed,
    /// Stopped by the cancellation token before end of stream.
    Cancelled,
}

/// Counters collected over one playback run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub outcome: PlaybackOutcome,
    pub chunks_written: u64,
    pub bytes_written: u64,
    pub discontinuities: u64,
    pub first_clock: Option<Duration>,
    pub last_clock: Option<Duration>,
    /// Largest amount by which a chunk missed its deadline.
    pub max_lateness: Duration,
    pub elapsed: Duration,
}

impl PlaybackSummary {
    fn new() -> Self {
        Self {
            outcome: PlaybackOutcome::Completed,
            chunks_written: 0,
            bytes_written: 0,
            discontinuities: 0,
            first_clock: None,
            last_clock: None,
            max_lateness: Duration::ZERO,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome == PlaybackOutcome::Cancelled
    }
}

/// Replays a transport stream into a [`Sink`] at the cadence of its PCRs.
///
/// Each run reads a chunk, validates it, feeds its PCR to a fresh
/// [`ClockState`], waits for the chunk's deadline and writes it, in file
/// order, until end of stream or cancellation. I/O and protocol errors
/// abort the run and are returned unchanged.
#[derive(Debug, Clone, Default)]
pub struct ReplayEngine {
    config: PacingConfig,
    parser: TSPacketParser,
}

impl ReplayEngine {
    pub fn new(config: PacingConfig) -> Self {
        Self {
            config,
            parser: TSPacketParser::new(),
        }
    }

    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Opens `path` and replays it into `sink`.
    pub async fn stream_file<P, S>(
        &self,
        path: P,
        sink: &S,
        cancel: &CancellationToken,
    ) -> Result<PlaybackSummary>
    where
        P: AsRef<Path>,
        S: Sink + ?Sized,
    {
        let path = path.as_ref();
        let mut reader = ChunkReader::open(path, self.config.chunk_size).await?;
        info!("Streaming {} in {}-byte chunks", path.display(), self.config.chunk_size);

        let summary = self.run(&mut reader, sink, cancel).await?;
        info!(
            "Finished {} ({:?}): {} chunks, {} bytes, {} discontinuities in {:?}",
            path.display(),
            summary.outcome,
            summary.chunks_written,
            summary.bytes_written,
            summary.discontinuities,
            summary.elapsed
        );
        Ok(summary)
    }

    /// Replays chunks from `reader` into `sink`.
    pub async fn run<R, S>(
        &self,
        reader: &mut ChunkReader<R>,
        sink: &S,
        cancel: &CancellationToken,
    ) -> Result<PlaybackSummary>
    where
        R: AsyncRead + Unpin,
        S: Sink + ?Sized,
    {
        let started = Instant::now();
        let scheduler = Scheduler::new(cancel.clone());
        let mut clock = ClockState::new(self.config.window);
        let mut summary = PlaybackSummary::new();

        loop {
            if scheduler.is_cancelled() {
                summary.outcome = PlaybackOutcome::Cancelled;
                break;
            }

            let Some(chunk) = reader.next_chunk().await? else {
                break;
            };

            let pcr = self.parser.chunk_pcr(&chunk, self.config.pcr_scan)?;
            let value = pcr.map(|pcr| pcr.as_duration());
            match clock.observe(value, Instant::now()) {
                ClockEvent::Started => debug!("Clock started at {:?}", value),
                ClockEvent::Discontinuity { from, to } => {
                    warn!("PCR discontinuity {:?} -> {:?}, re-anchoring", from, to);
                    summary.discontinuities += 1;
                }
                ClockEvent::Idle | ClockEvent::Carried | ClockEvent::Continuous => {}
            }
            if let Some(value) = value {
                summary.first_clock.get_or_insert(value);
                summary.last_clock = Some(value);
            }

            if scheduler.is_cancelled() {
                summary.outcome = PlaybackOutcome::Cancelled;
                break;
            }

            if let Some(deadline) = scheduler.deadline(&clock) {
                match scheduler.wait_until(deadline).await {
                    WaitOutcome::Cancelled => {
                        summary.outcome = PlaybackOutcome::Cancelled;
                        break;
                    }
                    WaitOutcome::Late(late) => {
                        summary.max_lateness = summary.max_lateness.max(late);
                    }
                    WaitOutcome::Ready => {}
                }
            }

            sink.write_chunk(&chunk).await?;
            summary.chunks_written += 1;
            summary.bytes_written += chunk.len() as u64;
        }

        summary.elapsed = started.elapsed();
        Ok(summary)
    }
}
