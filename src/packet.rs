//! Encoded media packets and the codec parameters that describe them

use std::time::Duration;

/// Index of the primary (video) stream.
pub const PRIMARY_STREAM: u8 = 0;

/// Encoded access unit as delivered by the upstream source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Elementary stream index (position in the codec parameter list)
    pub idx: u8,
    /// Presentation time since the start of the stream
    pub time: Duration,
    /// Packet duration
    pub duration: Duration,
    /// Is this a keyframe?
    pub is_keyframe: bool,
    /// Encoded data
    pub data: Vec<u8>,
}

impl Packet {
    /// Whether this packet belongs to the primary stream
    pub fn is_primary(&self) -> bool {
        self.idx == PRIMARY_STREAM
    }

    /// Keyframe on the primary stream: the only place a group or segment may start
    pub fn is_primary_keyframe(&self) -> bool {
        self.is_keyframe && self.is_primary()
    }
}

/// Per-stream codec descriptor, forwarded untouched from the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamParameters {
    /// H.264 video
    H264 {
        width: u16,
        height: u16,
        /// Sequence Parameter Set NAL unit
        sps: Vec<u8>,
        /// Picture Parameter Set NAL unit
        pps: Vec<u8>,
    },
    /// AAC audio
    Aac {
        sample_rate: u32,
        channels: u16,
        /// AudioSpecificConfig bytes
        config: Vec<u8>,
    },
}

impl StreamParameters {
    /// Short codec name for logs
    pub fn codec_name(&self) -> &'static str {
        match self {
            StreamParameters::H264 { .. } => "h264",
            StreamParameters::Aac { .. } => "aac",
        }
    }
}

/// Ordered codec descriptors, one per elementary stream
pub type CodecParameters = Vec<StreamParameters>;
