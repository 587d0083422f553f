#![doc(html_root_url = "https://docs.rs/tsreplay/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # tsreplay - real-time MPEG-TS replay
//!
//! `tsreplay` plays a recorded MPEG transport stream into a live sink at the
//! pace it was originally broadcast, using the program clock references
//! (PCRs) embedded in the stream. It is meant for load-testing clients and
//! servers of live streaming endpoints with realistic traffic.
//!
//! ## Features
//!
//! - Packet-aligned chunk reading with strict trailing-data checks
//! - Sync byte validation and PCR extraction from the adaptation field
//! - Clock recovery that re-anchors on stream restarts and loops
//! - Cancellable wall-clock scheduling that never drops late chunks
//! - UDP and TCP sinks with before/after traffic accounting
//! - Repeating background replays with automatic restart
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use tsreplay::config::ReplayConfig;
//! use tsreplay::host::{LogReporter, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReplayConfig {
//!         endpoint: "udp://127.0.0.1:9000".into(),
//!         ..Default::default()
//!     };
//!     let session = Session::connect(&config, Arc::new(LogReporter)).await?;
//!
//!     let report = session
//!         .stream_file("capture.ts", &CancellationToken::new())
//!         .await?;
//!     println!(
//!         "{} chunks, {} bytes on the wire",
//!         report.summary.chunks_written, report.traffic.bytes_sent
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - `format`: transport stream framing
//!   - Packet header and PCR parsing
//!   - Fixed-size chunk reading
//!
//! - `pacing`: the real-time engine
//!   - Clock recovery and discontinuity detection
//!   - Deadline scheduling
//!   - The replay loop
//!
//! - `transport`: sinks and traffic statistics
//!
//! - `host`: sessions, background replays and error reporting
//!
//! - `config`: file and environment configuration
//!
//! - `error`: error type and result alias

/// Configuration module
pub mod config;

/// Error types and utilities
pub mod error;

/// Media format implementations
pub mod format;

/// Sessions and background replays
pub mod host;

/// Real-time pacing engine
pub mod pacing;

/// Sinks and transport statistics
pub mod transport;

pub use error::{ReplayError, Result};
pub use pacing::{PacingConfig, PlaybackOutcome, PlaybackSummary, ReplayEngine};
