//! Group of frames: the unit stored in the indexed format
//!
//! A group starts at a primary-stream keyframe and holds every packet up to
//! the next one. Each group is written to the `.d` file as a self-contained
//! little-endian blob:
//!
//! ```text
//! "NVRG" | u8 version | u64 body_len | body
//! body:   u16 stream_count | stream*  | u32 packet_count | packet*
//! stream: u8 kind (1 = H.264, 2 = AAC)
//!         H.264: u16 width | u16 height | u32 len | sps | u32 len | pps
//!         AAC:   u32 sample_rate | u16 channels | u32 len | config
//! packet: u8 idx | u8 flags (bit 0 = keyframe) | u64 time_ns
//!         | u64 duration_ns | u32 len | data
//! ```

use crate::packet::{Packet, StreamParameters};
use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};
use std::time::Duration;

const GOF_TAG: &[u8; 4] = b"NVRG";
const GOF_VERSION: u8 = 1;

const KIND_H264: u8 = 1;
const KIND_AAC: u8 = 2;

const FLAG_KEYFRAME: u8 = 0x01;

/// Upper bound for a single length-prefixed field when decoding
const MAX_FIELD_LEN: u32 = 64 * 1024 * 1024;

/// Keyframe-aligned packet buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gof {
    pub streams: Vec<StreamParameters>,
    pub packets: Vec<Packet>,
}

impl Gof {
    pub fn new(streams: Vec<StreamParameters>) -> Self {
        Self {
            streams,
            packets: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Serialize the group into a standalone blob
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body = Vec::with_capacity(
            64 + self.packets.iter().map(|p| p.data.len() + 22).sum::<usize>(),
        );

        body.write_u16::<LittleEndian>(len_u16(self.streams.len(), "stream count")?)?;
        for stream in &self.streams {
            match stream {
                StreamParameters::H264 {
                    width,
                    height,
                    sps,
                    pps,
                } => {
                    body.write_u8(KIND_H264)?;
                    body.write_u16::<LittleEndian>(*width)?;
                    body.write_u16::<LittleEndian>(*height)?;
                    write_bytes(&mut body, sps)?;
                    write_bytes(&mut body, pps)?;
                }
                StreamParameters::Aac {
                    sample_rate,
                    channels,
                    config,
                } => {
                    body.write_u8(KIND_AAC)?;
                    body.write_u32::<LittleEndian>(*sample_rate)?;
                    body.write_u16::<LittleEndian>(*channels)?;
                    write_bytes(&mut body, config)?;
                }
            }
        }

        body.write_u32::<LittleEndian>(len_u32(self.packets.len(), "packet count")?)?;
        for packet in &self.packets {
            body.write_u8(packet.idx)?;
            body.write_u8(if packet.is_keyframe { FLAG_KEYFRAME } else { 0 })?;
            body.write_u64::<LittleEndian>(packet.time.as_nanos() as u64)?;
            body.write_u64::<LittleEndian>(packet.duration.as_nanos() as u64)?;
            write_bytes(&mut body, &packet.data)?;
        }

        let mut blob = Vec::with_capacity(body.len() + 13);
        blob.extend_from_slice(GOF_TAG);
        blob.write_u8(GOF_VERSION)?;
        blob.write_u64::<LittleEndian>(body.len() as u64)?;
        blob.extend_from_slice(&body);
        Ok(blob)
    }

    /// Decode one group from the current position of `reader`
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let mut tag = [0u8; 4];
        reader.read_exact(&mut tag)?;
        if &tag != GOF_TAG {
            return Err(Error::Format(format!("bad group tag {:?}", tag)));
        }
        let version = reader.read_u8()?;
        if version != GOF_VERSION {
            return Err(Error::Format(format!(
                "unsupported group version {}",
                version
            )));
        }
        let body_len = reader.read_u64::<LittleEndian>()?;
        let mut body = reader.by_ref().take(body_len);

        let stream_count = body.read_u16::<LittleEndian>()?;
        let mut streams = Vec::with_capacity(stream_count as usize);
        for _ in 0..stream_count {
            let stream = match body.read_u8()? {
                KIND_H264 => StreamParameters::H264 {
                    width: body.read_u16::<LittleEndian>()?,
                    height: body.read_u16::<LittleEndian>()?,
                    sps: read_bytes(&mut body)?,
                    pps: read_bytes(&mut body)?,
                },
                KIND_AAC => StreamParameters::Aac {
                    sample_rate: body.read_u32::<LittleEndian>()?,
                    channels: body.read_u16::<LittleEndian>()?,
                    config: read_bytes(&mut body)?,
                },
                kind => return Err(Error::Format(format!("unknown stream kind {}", kind))),
            };
            streams.push(stream);
        }

        let packet_count = body.read_u32::<LittleEndian>()?;
        let mut packets = Vec::with_capacity(packet_count.min(4096) as usize);
        for _ in 0..packet_count {
            let idx = body.read_u8()?;
            let flags = body.read_u8()?;
            let time = Duration::from_nanos(body.read_u64::<LittleEndian>()?);
            let duration = Duration::from_nanos(body.read_u64::<LittleEndian>()?);
            let data = read_bytes(&mut body)?;
            packets.push(Packet {
                idx,
                time,
                duration,
                is_keyframe: flags & FLAG_KEYFRAME != 0,
                data,
            });
        }

        if body.limit() != 0 {
            return Err(Error::Format(format!(
                "{} trailing bytes in group body",
                body.limit()
            )));
        }

        Ok(Self { streams, packets })
    }

    /// Decode the group stored at byte `offset` of a data file
    pub fn read_at<R: Read + Seek>(reader: &mut R, offset: u64) -> Result<Self> {
        reader.seek(SeekFrom::Start(offset))?;
        Self::decode(reader)
    }
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    out.write_u32::<LittleEndian>(len_u32(bytes.len(), "field length")?)?;
    out.write_all(bytes)?;
    Ok(())
}

fn read_bytes<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let len = reader.read_u32::<LittleEndian>()?;
    if len > MAX_FIELD_LEN {
        return Err(Error::Format(format!("field length {} out of range", len)));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn len_u16(len: usize, what: &str) -> Result<u16> {
    u16::try_from(len).map_err(|_| Error::Format(format!("{} {} too large", what, len)))
}

fn len_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::Format(format!("{} {} too large", what, len)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_gof() -> Gof {
        let mut gof = Gof::new(vec![
            StreamParameters::H264 {
                width: 1280,
                height: 720,
                sps: vec![0x67, 0x42, 0x00, 0x1f],
                pps: vec![0x68, 0xce, 0x3c, 0x80],
            },
            StreamParameters::Aac {
                sample_rate: 48000,
                channels: 2,
                config: vec![0x11, 0x90],
            },
        ]);
        gof.packets.push(Packet {
            idx: 0,
            time: Duration::from_millis(1000),
            duration: Duration::from_millis(40),
            is_keyframe: true,
            data: vec![1, 2, 3],
        });
        gof.packets.push(Packet {
            idx: 1,
            time: Duration::from_millis(1010),
            duration: Duration::from_millis(21),
            is_keyframe: false,
            data: vec![9; 17],
        });
        gof
    }

    #[test]
    fn test_decode_matches_encoded_group() {
        let gof = sample_gof();
        let blob = gof.encode().unwrap();
        assert_eq!(&blob[..4], b"NVRG");

        let decoded = Gof::decode(&mut Cursor::new(&blob)).unwrap();
        assert_eq!(decoded, gof);
    }

    #[test]
    fn test_read_at_offset() {
        let first = sample_gof();
        let mut second = sample_gof();
        second.packets.truncate(1);

        let mut file = first.encode().unwrap();
        let offset = file.len() as u64;
        file.extend(second.encode().unwrap());

        let mut cursor = Cursor::new(file);
        assert_eq!(Gof::read_at(&mut cursor, offset).unwrap(), second);
        assert_eq!(Gof::read_at(&mut cursor, 0).unwrap(), first);
    }

    #[test]
    fn test_bad_tag_rejected() {
        let mut blob = sample_gof().encode().unwrap();
        blob[0] = b'X';
        assert!(matches!(
            Gof::decode(&mut Cursor::new(&blob)),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_truncated_blob_is_error() {
        let blob = sample_gof().encode().unwrap();
        let truncated = &blob[..blob.len() - 5];
        assert!(Gof::decode(&mut Cursor::new(truncated)).is_err());
    }
}
