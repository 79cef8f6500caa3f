//! Container-format segment writer
//!
//! Writes one container file at a time through a [`Muxer`]. A segment is
//! written to a temporary file next to its destination and renamed to the
//! rendered path template once its trailer is written. Rotation is only
//! considered at primary keyframes, so every finished file starts with one.

use crate::clock::Clock;
use crate::muxer::{Muxer, MuxerFactory};
use crate::packet::{CodecParameters, Packet};
use crate::template::{PathTemplate, SegmentTiming};
use crate::{Identity, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

struct ActiveSegment {
    muxer: Box<dyn Muxer>,
    temp_path: PathBuf,
    packets: u64,
}

pub struct SegmentWriter {
    template: PathTemplate,
    identity: Identity,
    limit: Duration,
    clock: Box<dyn Clock>,
    factory: MuxerFactory,
    streams: CodecParameters,
    timing: SegmentTiming,
    active: Option<ActiveSegment>,
}

impl SegmentWriter {
    pub fn new(
        template: PathTemplate,
        identity: Identity,
        limit: Duration,
        clock: Box<dyn Clock>,
        factory: MuxerFactory,
    ) -> Self {
        let timing = SegmentTiming::starting_at(clock.now());
        Self {
            template,
            identity,
            limit,
            clock,
            factory,
            streams: Vec::new(),
            timing,
            active: None,
        }
    }

    /// Store the codec parameters and open the first segment
    pub fn write_header(&mut self, streams: CodecParameters) -> Result<()> {
        self.streams = streams;
        self.finalize()?;
        self.open_segment()
    }

    /// Forward a packet, rotating first when it is a primary keyframe and the
    /// segment has reached the limit.
    ///
    /// A failure to finish the previous segment does not stop the new one:
    /// the packet is still written and the error is returned afterwards. The
    /// unfinished file stays behind as a temp file.
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        let open_new = match &self.active {
            None => true,
            Some(active) => {
                packet.is_primary_keyframe()
                    && active.packets > 0
                    && self.timing.duration >= self.limit
            }
        };
        let mut finished = Ok(());
        if open_new {
            if !packet.is_primary_keyframe() {
                tracing::trace!(
                    stream = %self.identity.stream_name,
                    "no open segment, waiting for keyframe"
                );
                return Ok(());
            }
            finished = self.finalize();
            if let Err(e) = &finished {
                tracing::warn!(
                    stream = %self.identity.stream_name,
                    error = %e,
                    "failed to finalize segment"
                );
            }
            self.open_segment()?;
        }

        let Some(active) = self.active.as_mut() else {
            return finished;
        };
        if active.packets == 0 {
            self.timing.pts_start = packet.time;
        }
        self.timing.duration += packet.duration;
        self.timing.pts_end = packet.time;

        active.muxer.write_packet(packet)?;
        active.packets += 1;
        finished
    }

    /// Finish the active segment, if any
    pub fn close(&mut self) -> Result<()> {
        self.finalize()
    }

    /// Start a new temp file. The previous segment must be finalized.
    fn open_segment(&mut self) -> Result<()> {
        self.timing = SegmentTiming::starting_at(self.clock.now());
        let draft = PathBuf::from(self.template.render(&self.identity, &self.timing));
        let dir = parent_dir(&draft);
        fs::create_dir_all(&dir)?;

        let suffix = draft
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let (file, temp_path) = tempfile::Builder::new()
            .prefix("tmp")
            .suffix(&suffix)
            .tempfile_in(&dir)?
            .keep()?;

        let mut muxer = (self.factory)(file)?;
        muxer.write_header(&self.streams)?;

        tracing::debug!(
            stream = %self.identity.stream_name,
            temp = %temp_path.display(),
            "segment opened"
        );
        self.active = Some(ActiveSegment {
            muxer,
            temp_path,
            packets: 0,
        });
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let Some(ActiveSegment {
            muxer,
            temp_path,
            packets,
        }) = self.active.take()
        else {
            return Ok(());
        };

        muxer.write_trailer()?;

        if packets == 0 {
            fs::remove_file(&temp_path)?;
            tracing::debug!(
                stream = %self.identity.stream_name,
                "discarded empty segment"
            );
            return Ok(());
        }

        self.timing.end = self.clock.now();
        let path = PathBuf::from(self.template.render(&self.identity, &self.timing));
        fs::create_dir_all(parent_dir(&path))?;
        fs::rename(&temp_path, &path)?;

        tracing::info!(
            stream = %self.identity.stream_name,
            path = %path.display(),
            packets,
            duration_ms = self.timing.duration.as_millis() as u64,
            "segment finalized"
        );
        Ok(())
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
