//! # MPEG Transport Stream (TS) framing
//!
//! Only the physical framing needed to pace a stream is interpreted:
//!
//! - 188-byte packets and the `0x47` sync byte
//! - the adaptation field control bit, length and PCR flag
//! - the 33-bit base / 9-bit extension program clock reference
//!
//! PSI tables and PES payloads pass through untouched.
//!
//! ## Example Usage
//!
//! ```rust
//! use tsreplay::format::ts::{PcrScan, TSPacketParser, TS_PACKET_SIZE};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut packet = vec![0xFFu8; TS_PACKET_SIZE];
//! packet[0] = 0x47;
//! packet[3] = 0x10; // payload only
//!
//! let parser = TSPacketParser::new();
//! assert_eq!(parser.chunk_pcr(&packet, PcrScan::LastPacket)?, None);
//! # Ok(())
//! # }
//! ```

/// Low-level TS packet parsing utilities
pub mod parser;

/// Packet-aligned chunk reading
pub mod reader;

/// Core TS types and constants
pub mod types;

pub use parser::{PcrScan, TSPacketParser};
pub use reader::ChunkReader;
pub use types::{time_to_pcr, Pcr, TSHeader, PCR_HZ, SYNC_BYTE, TS_PACKET_SIZE};
