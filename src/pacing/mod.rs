//! # Real-time pacing
//!
//! [`ReplayEngine`] drives the loop; [`ClockState`] recovers the stream
//! clock from PCRs and [`Scheduler`] turns it into wall-clock deadlines.
//!
//! ```rust,no_run
//! use tsreplay::pacing::{PacingConfig, ReplayEngine};
//! use tsreplay::transport::{Endpoint, UdpSink};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sink = UdpSink::connect(&Endpoint::parse("udp://127.0.0.1:9000")?).await?;
//!     let engine = ReplayEngine::new(PacingConfig::default());
//!
//!     let summary = engine
//!         .stream_file("capture.ts", &sink, &CancellationToken::new())
//!         .await?;
//!     println!("sent {} bytes", summary.bytes_written);
//!     Ok(())
//! }
//! ```

/// PCR clock recovery and discontinuity detection
pub mod clock;

/// The read, pace and write loop
pub mod engine;

/// Deadline computation and cancellable waiting
pub mod scheduler;

pub use clock::{Anchor, ClockEvent, ClockState, DiscontinuityWindow};
pub use engine::{PacingConfig, PlaybackOutcome, PlaybackSummary, ReplayEngine, DEFAULT_CHUNK_SIZE};
pub use scheduler::{Scheduler, WaitOutcome};
