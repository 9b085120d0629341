//! Minimal libpcap writer.
//!
//! 24-byte global header followed by one 16-byte record header plus the
//! raw bytes per packet. Every integer is little-endian.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use bluefang_common::{BlueResult, CapturedPacket};

pub const MAGIC: u32 = 0xa1b2_c3d4;
const VERSION_MAJOR: u16 = 2;
const VERSION_MINOR: u16 = 4;
const SNAPLEN: u32 = 65_535;
/// Link type stamped on every export.
pub const LINKTYPE: u32 = 147;

pub struct PcapWriter<W: Write> {
    writer: W,
    records: usize,
    bytes_written: u64,
}

impl<W: Write> PcapWriter<W> {
    /// Write the global header.
    pub fn new(mut writer: W) -> std::io::Result<Self> {
        writer.write_all(&MAGIC.to_le_bytes())?;
        writer.write_all(&VERSION_MAJOR.to_le_bytes())?;
        writer.write_all(&VERSION_MINOR.to_le_bytes())?;
        writer.write_all(&0i32.to_le_bytes())?; // thiszone
        writer.write_all(&0u32.to_le_bytes())?; // sigfigs
        writer.write_all(&SNAPLEN.to_le_bytes())?;
        writer.write_all(&LINKTYPE.to_le_bytes())?;
        Ok(Self {
            writer,
            records: 0,
            bytes_written: 24,
        })
    }

    pub fn write_record(&mut self, ts_sec: u32, ts_usec: u32, data: &[u8]) -> std::io::Result<()> {
        let len = data.len() as u32;
        self.writer.write_all(&ts_sec.to_le_bytes())?;
        self.writer.write_all(&ts_usec.to_le_bytes())?;
        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(data)?;
        self.records += 1;
        self.bytes_written += 16 + data.len() as u64;
        Ok(())
    }

    /// Microseconds are only recorded when the trace supplied a timestamp.
    pub fn write_packet(&mut self, packet: &CapturedPacket) -> std::io::Result<()> {
        let secs = packet.timestamp.timestamp().max(0) as u32;
        let usecs = if packet.timestamp_from_trace {
            packet.timestamp.timestamp_subsec_micros().min(999_999)
        } else {
            0
        };
        self.write_record(secs, usecs, &packet.payload)
    }

    #[inline]
    pub fn records(&self) -> usize {
        self.records
    }

    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn finish(mut self) -> std::io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Export `packets` to `path`, replacing any existing file. Returns the
/// number of records written.
pub fn write_pcap<'a, I>(path: &Path, packets: I) -> BlueResult<usize>
where
    I: IntoIterator<Item = &'a CapturedPacket>,
{
    let mut pcap = PcapWriter::new(BufWriter::new(File::create(path)?))?;
    for packet in packets {
        pcap.write_packet(packet)?;
    }
    let records = pcap.records();
    pcap.finish()?;
    Ok(records)
}
