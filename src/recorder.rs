//! Recording session

use crate::clock::{Clock, SystemClock};
use crate::config::RecorderConfig;
use crate::muxer::{mp4_factory, MuxerFactory};
use crate::nvr::NvrWriter;
use crate::packet::{CodecParameters, Packet};
use crate::segment::SegmentWriter;
use crate::template::PathTemplate;
use crate::{Error, Format, Identity, Result};

/// Output-format specific writer
enum Sink {
    Mp4(SegmentWriter),
    Nvr(NvrWriter),
}

/// One recording of one stream/channel.
///
/// Call [`open`](Recorder::open) once with the codec parameters, then
/// [`submit`](Recorder::submit) packets in order, then
/// [`close`](Recorder::close). Packets are dropped until the first primary
/// keyframe so every stored segment or group starts at one.
pub struct Recorder {
    identity: Identity,
    sink: Sink,
    stream_count: usize,
    has_header: bool,
    started: bool,
    closed: bool,
}

impl Recorder {
    /// Create a recorder using the system clock and the MP4 muxer
    pub fn new(config: &RecorderConfig) -> Self {
        Self::with_parts(config, Box::new(SystemClock), mp4_factory())
    }

    /// Create a recorder with an explicit clock and container muxer
    pub fn with_parts(
        config: &RecorderConfig,
        clock: Box<dyn Clock>,
        muxer_factory: MuxerFactory,
    ) -> Self {
        let identity = config.identity();
        let sink = match config.format {
            Format::Mp4 => Sink::Mp4(SegmentWriter::new(
                PathTemplate::new(config.path.clone()),
                identity.clone(),
                config.limit(),
                clock,
                muxer_factory,
            )),
            Format::Nvr => Sink::Nvr(NvrWriter::new(&config.path, clock)),
        };

        Self {
            identity,
            sink,
            stream_count: 0,
            has_header: false,
            started: false,
            closed: false,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn format(&self) -> Format {
        match self.sink {
            Sink::Mp4(_) => Format::Mp4,
            Sink::Nvr(_) => Format::Nvr,
        }
    }

    /// Whether the first keyframe has been seen
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Set the codec parameters. In MP4 mode this opens the first segment.
    pub fn open(&mut self, streams: CodecParameters) -> Result<()> {
        if self.closed {
            return Err(Error::InvalidInput("recorder is closed".to_string()));
        }
        if self.has_header {
            return Err(Error::InvalidInput("header already written".to_string()));
        }
        if streams.is_empty() {
            return Err(Error::InvalidInput("no streams provided".to_string()));
        }

        tracing::debug!(
            stream = %self.identity.stream_name,
            channel = %self.identity.channel_name,
            codecs = ?streams.iter().map(|s| s.codec_name()).collect::<Vec<_>>(),
            "recorder header"
        );

        self.has_header = true;
        self.stream_count = streams.len();
        match &mut self.sink {
            Sink::Mp4(writer) => writer.write_header(streams),
            Sink::Nvr(writer) => {
                writer.write_header(streams);
                Ok(())
            }
        }
    }

    /// Record one packet. Ignored before `open`, after `close`, until the
    /// first primary keyframe, and when its stream index was never declared.
    pub fn submit(&mut self, packet: Packet) -> Result<()> {
        if self.closed || !self.has_header {
            return Ok(());
        }
        if usize::from(packet.idx) >= self.stream_count {
            tracing::trace!(
                stream = %self.identity.stream_name,
                idx = packet.idx,
                streams = self.stream_count,
                "dropping packet for unknown stream"
            );
            return Ok(());
        }
        if !self.started {
            if !packet.is_primary_keyframe() {
                tracing::trace!(
                    stream = %self.identity.stream_name,
                    idx = packet.idx,
                    "dropping packet before first keyframe"
                );
                return Ok(());
            }
            self.started = true;
            tracing::debug!(
                stream = %self.identity.stream_name,
                channel = %self.identity.channel_name,
                "first keyframe, recording started"
            );
        }

        match &mut self.sink {
            Sink::Mp4(writer) => writer.write_packet(&packet),
            Sink::Nvr(writer) => writer.write_packet(packet),
        }
    }

    /// Finish the active segment or group and close all files.
    /// Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match &mut self.sink {
            Sink::Mp4(writer) => writer.close(),
            Sink::Nvr(writer) => writer.close(),
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(
                stream = %self.identity.stream_name,
                error = %e,
                "failed to close recorder on drop"
            );
        }
    }
}
