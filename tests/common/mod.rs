//! Common test utilities

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use nvrmux::muxer::{Muxer, MuxerFactory};
use nvrmux::{Clock, Packet, Result, StreamParameters};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use walkdir::WalkDir;

/// Clock that only moves when told to
#[derive(Clone)]
pub struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

impl ManualClock {
    pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Self {
        Self(Arc::new(Mutex::new(
            Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap(),
        )))
    }

    pub fn set(&self, t: DateTime<Utc>) {
        *self.0.lock().unwrap() = t;
    }

    pub fn advance(&self, d: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += chrono::Duration::from_std(d).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Muxer call as seen by [`FakeMuxer`]
#[derive(Debug, Clone, PartialEq)]
pub enum MuxCall {
    Header { segment: usize, streams: usize },
    Packet { segment: usize, time_ms: u64, is_keyframe: bool },
    Trailer { segment: usize },
}

/// Muxer double that logs every call and writes a small marker per call
pub struct FakeMuxer {
    segment: usize,
    file: File,
    calls: Arc<Mutex<Vec<MuxCall>>>,
}

impl Muxer for FakeMuxer {
    fn write_header(&mut self, streams: &[StreamParameters]) -> Result<()> {
        self.file.write_all(b"H")?;
        self.calls.lock().unwrap().push(MuxCall::Header {
            segment: self.segment,
            streams: streams.len(),
        });
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        self.file.write_all(b"P")?;
        self.calls.lock().unwrap().push(MuxCall::Packet {
            segment: self.segment,
            time_ms: packet.time.as_millis() as u64,
            is_keyframe: packet.is_keyframe,
        });
        Ok(())
    }

    fn write_trailer(mut self: Box<Self>) -> Result<()> {
        self.file.write_all(b"T")?;
        self.calls.lock().unwrap().push(MuxCall::Trailer {
            segment: self.segment,
        });
        Ok(())
    }
}

/// Factory for [`FakeMuxer`]s sharing one call log
pub fn fake_factory() -> (MuxerFactory, Arc<Mutex<Vec<MuxCall>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&calls);
    let mut segment = 0;
    let factory: MuxerFactory = Box::new(move |file| {
        let muxer = FakeMuxer {
            segment,
            file,
            calls: Arc::clone(&log),
        };
        segment += 1;
        Ok(Box::new(muxer) as Box<dyn Muxer>)
    });
    (factory, calls)
}

/// H.264 parameters with a plausible SPS/PPS
pub fn h264_stream() -> StreamParameters {
    StreamParameters::H264 {
        width: 1280,
        height: 720,
        sps: vec![
            0x67, 0x42, 0xc0, 0x1f, 0xda, 0x01, 0x40, 0x16, 0xec, 0x04, 0x40, 0x00, 0x00, 0x03,
            0x00, 0x40, 0x00, 0x00, 0x0c, 0x83, 0xc6, 0x0c, 0xa8,
        ],
        pps: vec![0x68, 0xce, 0x3c, 0x80],
    }
}

pub fn aac_stream() -> StreamParameters {
    StreamParameters::Aac {
        sample_rate: 48000,
        channels: 2,
        config: vec![0x11, 0x90],
    }
}

pub fn video_packet(time_ms: u64, duration_ms: u64, is_keyframe: bool) -> Packet {
    Packet {
        idx: 0,
        time: Duration::from_millis(time_ms),
        duration: Duration::from_millis(duration_ms),
        is_keyframe,
        data: vec![0, 0, 0, 4, 0x65, 0x88, 0x84, (time_ms % 251) as u8],
    }
}

pub fn audio_packet(time_ms: u64, duration_ms: u64) -> Packet {
    Packet {
        idx: 1,
        time: Duration::from_millis(time_ms),
        duration: Duration::from_millis(duration_ms),
        is_keyframe: false,
        data: vec![0x21, 0x10, 0x05, (time_ms % 251) as u8],
    }
}

/// All regular files below `dir`, sorted
pub fn list_files<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    out.sort();
    out
}

/// Parse MP4 header to verify it's a valid MP4 file
pub fn verify_mp4_header<P: AsRef<Path>>(path: P) -> bool {
    use std::io::Read;

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };

    let mut header = [0u8; 12];
    if file.read_exact(&mut header).is_err() {
        return false;
    }

    // MP4 files have 'ftyp' box at offset 4
    &header[4..8] == b"ftyp"
}
