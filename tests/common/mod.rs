#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tsreplay::format::ts::{time_to_pcr, TS_PACKET_SIZE};
use tsreplay::transport::{Sink, TransportStats};
use tsreplay::Result;

/// Builds `count` packets; packet `i` carries the PCR returned by `clock(i)`.
pub fn build_stream<F>(count: usize, clock: F) -> Vec<u8>
where
    F: Fn(usize) -> Option<Duration>,
{
    let mut data = Vec::with_capacity(count * TS_PACKET_SIZE);
    for i in 0..count {
        let mut packet = vec![0xFFu8; TS_PACKET_SIZE];
        packet[0] = 0x47;
        packet[1] = 0x01;
        packet[2] = 0x00;
        packet[3] = 0x10 | (i % 16) as u8;
        if let Some(t) = clock(i) {
            packet[3] |= 0x20;
            packet[4] = 7;
            packet[5] = 0x10;
            packet[6..12].copy_from_slice(&time_to_pcr(t).to_bytes());
        }
        data.extend_from_slice(&packet);
    }
    data
}

/// Evenly spaced PCRs covering `span` over `count` packets.
pub fn linear_clock(count: usize, span: Duration) -> impl Fn(usize) -> Option<Duration> {
    move |i| {
        let step = span.as_micros() as u64 / (count.max(2) as u64 - 1);
        Some(Duration::from_secs(10) + Duration::from_micros(step * i as u64))
    }
}

pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

/// Collects written chunk sizes.
#[derive(Default)]
pub struct MemorySink {
    pub chunks: Mutex<Vec<usize>>,
}

impl MemorySink {
    pub fn sizes(&self) -> Vec<usize> {
        self.chunks.lock().clone()
    }

    pub fn total(&self) -> usize {
        self.chunks.lock().iter().sum()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn write_chunk(&self, chunk: &[u8]) -> Result<()> {
        self.chunks.lock().push(chunk.len());
        Ok(())
    }

    fn stats(&self) -> TransportStats {
        TransportStats {
            bytes_sent: self.total() as u64,
            ..Default::default()
        }
    }
}
