//! # Host-facing operations
//!
//! Everything a load-testing harness needs around the pacing engine:
//! connecting a [`Session`] to an endpoint, streaming a file over it,
//! draining what the peer sends back, and running repeating background
//! replays tracked by a [`ReplayRegistry`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tsreplay::config::ReplayConfig;
//! use tsreplay::host::{LogReporter, ReplayRegistry, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReplayConfig::load()?;
//!     let session = Arc::new(Session::connect(&config, Arc::new(LogReporter)).await?);
//!
//!     let registry = ReplayRegistry::new(config.restart_backoff);
//!     let handle = registry.start(session.clone(), "capture.ts");
//!     tokio::time::sleep(std::time::Duration::from_secs(60)).await;
//!     registry.stop(handle).await;
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

/// Background replay bookkeeping
pub mod registry;

/// Error reporting hook
pub mod reporter;

/// Connected sessions
pub mod session;

pub use registry::{ReplayHandle, ReplayRegistry};
pub use reporter::{ErrorReporter, LogReporter};
pub use session::{Session, StreamReport};
