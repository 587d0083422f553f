use super::types::*;
use crate::error::{Result, ReplayError};

/// Which packets of a chunk are inspected for a PCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PcrScan {
    /// Only the trailing packet of each chunk carries timing.
    #[default]
    LastPacket,
    /// Every packet is inspected; the last PCR in the chunk wins.
    AllPackets,
}

impl std::str::FromStr for PcrScan {
    type Err = ReplayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last" | "last_packet" => Ok(PcrScan::LastPacket),
            "all" | "all_packets" => Ok(PcrScan::AllPackets),
            other => Err(ReplayError::Config(format!("unknown pcr scan mode: {}", other))),
        }
    }
}

/// Stateless parser for the subset of TS fields used for pacing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TSPacketParser;

impl TSPacketParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_header(&self, data: &[u8]) -> Result<TSHeader> {
        if data.len() < TS_HEADER_SIZE {
            return Err(ReplayError::InvalidData("TS packet too short".into()));
        }

        if data[0] != SYNC_BYTE {
            return Err(ReplayError::Protocol("incorrect sync byte".into()));
        }

        Ok(TSHeader {
            sync_byte: data[0],
            transport_error: (data[1] & 0x80) != 0,
            payload_unit_start: (data[1] & 0x40) != 0,
            transport_priority: (data[1] & 0x20) != 0,
            pid: (((data[1] & 0x1F) as u16) << 8) | data[2] as u16,
            scrambling_control: (data[3] >> 6) & 0x03,
            adaptation_field_exists: (data[3] & ADAPTATION_FIELD_FLAG) != 0,
            contains_payload: (data[3] & PAYLOAD_FLAG) != 0,
            continuity_counter: data[3] & 0x0F,
        })
    }

    /// Decodes the PCR of a single packet, if it carries one.
    pub fn parse_pcr(&self, data: &[u8]) -> Result<Option<Pcr>> {
        let header = self.parse_header(data)?;
        if !header.adaptation_field_exists {
            return Ok(None);
        }

        if data.len() < TS_PACKET_SIZE {
            return Err(ReplayError::InvalidData(format!(
                "TS packet is {} bytes, expected {}",
                data.len(),
                TS_PACKET_SIZE
            )));
        }

        let adaptation_field_length = data[4];
        if adaptation_field_length > MAX_ADAPTATION_FIELD_LENGTH {
            return Err(ReplayError::Protocol(
                "adaptation field length too long".into(),
            ));
        }

        if adaptation_field_length < MIN_PCR_ADAPTATION_FIELD_LENGTH || (data[5] & PCR_FLAG) == 0 {
            return Ok(None);
        }

        let pcr_base = ((data[6] as u64) << 25)
            | ((data[7] as u64) << 17)
            | ((data[8] as u64) << 9)
            | ((data[9] as u64) << 1)
            | ((data[10] & 0x80) as u64 >> 7);
        let pcr_ext = (((data[10] & 0x01) as u16) << 8) | (data[11] as u16);

        Ok(Some(Pcr::new(pcr_base, pcr_ext)))
    }

    /// Validates every packet of a chunk and extracts its timing PCR.
    ///
    /// Sync bytes are checked on all packets so a corrupt packet never
    /// reaches the sink, whatever its position in the chunk.
    pub fn chunk_pcr(&self, chunk: &[u8], scan: PcrScan) -> Result<Option<Pcr>> {
        if chunk.is_empty() || chunk.len() % TS_PACKET_SIZE != 0 {
            return Err(ReplayError::InvalidData(format!(
                "chunk of {} bytes is not a whole number of packets",
                chunk.len()
            )));
        }

        let packet_count = chunk.len() / TS_PACKET_SIZE;
        let mut pcr = None;
        for (index, packet) in chunk.chunks_exact(TS_PACKET_SIZE).enumerate() {
            let is_last = index + 1 == packet_count;
            match scan {
                PcrScan::AllPackets => {
                    if let Some(found) = self.parse_pcr(packet)? {
                        pcr = Some(found);
                    }
                }
                PcrScan::LastPacket if is_last => pcr = self.parse_pcr(packet)?,
                PcrScan::LastPacket => {
                    self.parse_header(packet)?;
                }
            }
        }

        Ok(pcr)
    }
}
