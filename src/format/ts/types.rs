use std::time::Duration;

// Framing
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const SYNC_BYTE: u8 = 0x47;

// Adaptation field
pub const MAX_ADAPTATION_FIELD_LENGTH: u8 = 183;
/// Flags byte plus the 6 PCR bytes.
pub const MIN_PCR_ADAPTATION_FIELD_LENGTH: u8 = 7;
pub const ADAPTATION_FIELD_FLAG: u8 = 0x20;
pub const PAYLOAD_FLAG: u8 = 0x10;
pub const PCR_FLAG: u8 = 0x10;

// Clocks
pub const PCR_HZ: u64 = 27_000_000;
pub const PCR_TICKS_PER_MICROSECOND: u64 = PCR_HZ / 1_000_000;
pub const PCR_BASE_MULTIPLIER: u64 = 300;

/// The 4-byte header of a transport packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TSHeader {
    pub sync_byte: u8, // Always 0x47
    pub transport_error: bool,
    pub payload_unit_start: bool,
    pub transport_priority: bool,
    pub pid: u16,
    pub scrambling_control: u8,
    pub adaptation_field_exists: bool,
    pub contains_payload: bool,
    pub continuity_counter: u8,
}

/// Program clock reference as carried in the adaptation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pcr {
    /// 33-bit base, 90 kHz units.
    pub base: u64,
    /// 9-bit extension, 27 MHz units (0..300).
    pub extension: u16,
}

impl Pcr {
    pub fn new(base: u64, extension: u16) -> Self {
        Self {
            base: base & 0x1_ffff_ffff,
            extension: extension & 0x1ff,
        }
    }

    /// Full 27 MHz tick count.
    pub fn ticks(&self) -> u64 {
        self.base * PCR_BASE_MULTIPLIER + self.extension as u64
    }

    /// Recovered clock value, truncated to whole microseconds.
    pub fn as_duration(&self) -> Duration {
        Duration::from_micros(self.ticks() / PCR_TICKS_PER_MICROSECOND)
    }

    /// Writes the 6 PCR bytes as laid out in the adaptation field.
    pub fn to_bytes(&self) -> [u8; 6] {
        let base = self.base;
        [
            (base >> 25) as u8,
            (base >> 17) as u8,
            (base >> 9) as u8,
            (base >> 1) as u8,
            ((base & 0x01) << 7) as u8 | 0x7e | ((self.extension >> 8) & 0x01) as u8,
            self.extension as u8,
        ]
    }
}

/// Inverse of [`Pcr::as_duration`] for whole microseconds.
pub fn time_to_pcr(time: Duration) -> Pcr {
    let ticks = time.as_micros() as u64 * PCR_TICKS_PER_MICROSECOND;
    Pcr::new(ticks / PCR_BASE_MULTIPLIER, (ticks % PCR_BASE_MULTIPLIER) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pcr_ticks_and_duration() {
        // 1 second: base 90_000, extension 0
        let pcr = Pcr::new(90_000, 0);
        assert_eq!(pcr.ticks(), 27_000_000);
        assert_eq!(pcr.as_duration(), Duration::from_secs(1));

        // 300 * 1 + 26 = 326 ticks -> 12 us (326 / 27 = 12.07)
        let pcr = Pcr::new(1, 26);
        assert_eq!(pcr.ticks(), 326);
        assert_eq!(pcr.as_duration(), Duration::from_micros(12));
    }

    #[test]
    fn test_pcr_masks_field_widths() {
        let pcr = Pcr::new(u64::MAX, u16::MAX);
        assert_eq!(pcr.base, (1 << 33) - 1);
        assert_eq!(pcr.extension, 511);
    }

    #[test]
    fn test_time_to_pcr() {
        let pcr = time_to_pcr(Duration::from_millis(40));
        assert_eq!(pcr.ticks(), 1_080_000);
        assert_eq!(pcr.as_duration(), Duration::from_millis(40));
    }
}
