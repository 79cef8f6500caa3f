//! Index records of the indexed format
//!
//! Every flushed group gets one 32-byte record in the hour's `.m` file, all
//! fields little-endian:
//!
//! ```text
//! i64 time_ns | i64 offset | i64 duration_ms | [u8; 8] MAGIC
//! ```
//!
//! The magic marker lets a reader resynchronise after a torn write.

use crate::Result;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::Read;

/// Trailer of every index record
pub const MAGIC: [u8; 8] = [11, 22, 111, 222, 11, 22, 111, 222];

/// Encoded size of an index record including the magic marker
pub const RECORD_SIZE: usize = 32;

/// Location and timing of one group in the data file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    /// Wall-clock write time, nanoseconds since the Unix epoch
    pub time_ns: i64,
    /// Byte offset of the group blob within the `.d` file
    pub offset: i64,
    /// Primary-stream duration of the group in milliseconds
    pub duration_ms: i64,
}

impl IndexRecord {
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        LittleEndian::write_i64(&mut buf[0..8], self.time_ns);
        LittleEndian::write_i64(&mut buf[8..16], self.offset);
        LittleEndian::write_i64(&mut buf[16..24], self.duration_ms);
        buf[24..].copy_from_slice(&MAGIC);
        buf
    }

    /// Decode a record, or `None` if the magic marker does not match
    pub fn decode(bytes: &[u8; RECORD_SIZE]) -> Option<Self> {
        if bytes[24..] != MAGIC {
            return None;
        }
        let mut cursor = &bytes[..24];
        Some(Self {
            time_ns: cursor.read_i64::<LittleEndian>().ok()?,
            offset: cursor.read_i64::<LittleEndian>().ok()?,
            duration_ms: cursor.read_i64::<LittleEndian>().ok()?,
        })
    }

    /// Read every valid record from an index stream.
    ///
    /// Bytes that do not form a record ending in [`MAGIC`] are skipped one at
    /// a time until the stream is back in sync. An incomplete tail is dropped.
    pub fn read_all<R: Read>(reader: &mut R) -> Result<Vec<Self>> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let mut records = Vec::with_capacity(bytes.len() / RECORD_SIZE);
        let mut skipped = 0usize;
        let mut pos = 0usize;
        while pos + RECORD_SIZE <= bytes.len() {
            let mut window = [0u8; RECORD_SIZE];
            window.copy_from_slice(&bytes[pos..pos + RECORD_SIZE]);
            match Self::decode(&window) {
                Some(record) => {
                    records.push(record);
                    pos += RECORD_SIZE;
                }
                None => {
                    skipped += 1;
                    pos += 1;
                }
            }
        }

        let tail = bytes.len() - pos;
        if skipped > 0 || tail > 0 {
            tracing::warn!(
                skipped,
                tail,
                records = records.len(),
                "index stream out of sync"
            );
        }

        Ok(records)
    }
}
