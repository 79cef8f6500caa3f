//! MP4 container muxer

use super::Muxer;
use crate::packet::{Packet, StreamParameters};
use crate::{Error, Result};
use mp4::{Mp4Config, Mp4Writer, TrackConfig};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Duration;

/// Track timescale (milliseconds)
const TIMESCALE: u32 = 1000;

/// MP4 muxer (H.264 video and AAC audio tracks)
pub struct Mp4Muxer {
    output: Option<BufWriter<File>>,
    writer: Option<Mp4Writer<BufWriter<File>>>,
    tracks: Vec<TrackState>,
}

#[derive(Default)]
struct TrackState {
    first_time: Option<Duration>,
    sample_count: u32,
}

impl Mp4Muxer {
    pub fn new(file: File) -> Self {
        Self {
            output: Some(BufWriter::new(file)),
            writer: None,
            tracks: Vec::new(),
        }
    }
}

impl Muxer for Mp4Muxer {
    fn write_header(&mut self, streams: &[StreamParameters]) -> Result<()> {
        let output = self
            .output
            .take()
            .ok_or_else(|| Error::Mux("MP4 header already written".to_string()))?;

        let mp4_config = Mp4Config {
            major_brand: str_to_brand("isom"),
            minor_version: 512,
            compatible_brands: vec![
                str_to_brand("isom"),
                str_to_brand("iso2"),
                str_to_brand("avc1"),
                str_to_brand("mp41"),
            ],
            timescale: TIMESCALE,
        };

        let mut writer = Mp4Writer::write_start(output, &mp4_config)
            .map_err(|e| Error::Mux(format!("Failed to create MP4 writer: {}", e)))?;

        for stream in streams {
            writer
                .add_track(&track_config(stream)?)
                .map_err(|e| Error::Mux(format!("Failed to add track: {}", e)))?;
            self.tracks.push(TrackState::default());
        }

        self.writer = Some(writer);
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::Mux("MP4 packet written before header".to_string()))?;
        let track = self.tracks.get_mut(packet.idx as usize).ok_or_else(|| {
            Error::Mux(format!("Packet for unknown stream index {}", packet.idx))
        })?;

        let first_time = *track.first_time.get_or_insert(packet.time);
        let sample = mp4::Mp4Sample {
            start_time: packet.time.saturating_sub(first_time).as_millis() as u64,
            duration: packet.duration.as_millis() as u32,
            rendering_offset: 0,
            is_sync: packet.is_keyframe,
            bytes: mp4::Bytes::copy_from_slice(&packet.data),
        };

        // Track IDs are 1-based in the order the tracks were added
        writer
            .write_sample(packet.idx as u32 + 1, &sample)
            .map_err(|e| Error::Mux(format!("Failed to write sample: {}", e)))?;

        track.sample_count += 1;
        Ok(())
    }

    fn write_trailer(mut self: Box<Self>) -> Result<()> {
        let mut output = match self.writer.take() {
            Some(mut writer) => {
                writer
                    .write_end()
                    .map_err(|e| Error::Mux(format!("Failed to finalize MP4: {}", e)))?;
                writer.into_writer()
            }
            None => match self.output.take() {
                Some(output) => output,
                None => return Ok(()),
            },
        };

        output.flush().map_err(Error::Io)?;
        tracing::trace!(
            samples = self.tracks.iter().map(|t| t.sample_count).sum::<u32>(),
            "mp4 trailer written"
        );
        Ok(())
    }
}

fn track_config(stream: &StreamParameters) -> Result<TrackConfig> {
    let (track_type, media_conf) = match stream {
        StreamParameters::H264 {
            width,
            height,
            sps,
            pps,
        } => {
            // avcC takes the profile and level from the first SPS bytes
            if sps.len() < 4 {
                return Err(Error::Mux("H.264 SPS is too short".to_string()));
            }
            (
                mp4::TrackType::Video,
                mp4::MediaConfig::AvcConfig(mp4::AvcConfig {
                    width: *width,
                    height: *height,
                    seq_param_set: sps.clone(),
                    pic_param_set: pps.clone(),
                }),
            )
        }
        StreamParameters::Aac {
            sample_rate,
            channels,
            ..
        } => (
            mp4::TrackType::Audio,
            mp4::MediaConfig::AacConfig(mp4::AacConfig {
                bitrate: 0,
                profile: mp4::AudioObjectType::AacLowComplexity,
                freq_index: freq_index(*sample_rate)?,
                chan_conf: channel_config(*channels)?,
            }),
        ),
    };

    Ok(TrackConfig {
        track_type,
        timescale: TIMESCALE,
        language: String::from("und"),
        media_conf,
    })
}

fn freq_index(sample_rate: u32) -> Result<mp4::SampleFreqIndex> {
    use mp4::SampleFreqIndex::*;

    Ok(match sample_rate {
        96000 => Freq96000,
        88200 => Freq88200,
        64000 => Freq64000,
        48000 => Freq48000,
        44100 => Freq44100,
        32000 => Freq32000,
        24000 => Freq24000,
        22050 => Freq22050,
        16000 => Freq16000,
        12000 => Freq12000,
        11025 => Freq11025,
        8000 => Freq8000,
        7350 => Freq7350,
        other => {
            return Err(Error::Mux(format!(
                "Unsupported AAC sample rate: {}",
                other
            )))
        }
    })
}

fn channel_config(channels: u16) -> Result<mp4::ChannelConfig> {
    use mp4::ChannelConfig::*;

    Ok(match channels {
        1 => Mono,
        2 => Stereo,
        3 => Three,
        4 => Four,
        5 => Five,
        6 => FiveOne,
        8 => SevenOne,
        other => {
            return Err(Error::Mux(format!(
                "Unsupported AAC channel count: {}",
                other
            )))
        }
    })
}

fn str_to_brand(s: &str) -> mp4::FourCC {
    let bytes = s.as_bytes();
    mp4::FourCC {
        value: [
            bytes.first().copied().unwrap_or(0),
            bytes.get(1).copied().unwrap_or(0),
            bytes.get(2).copied().unwrap_or(0),
            bytes.get(3).copied().unwrap_or(0),
        ],
    }
}
