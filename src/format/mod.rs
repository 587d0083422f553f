/// MPEG transport stream framing
pub mod ts;

pub use self::ts::{ChunkReader, Pcr, PcrScan, TSPacketParser};
