//! nvrmux - Segment-rotating recorder for encoded media packets
//!
//! A [`Recorder`] takes codec parameters once and then an unbounded stream
//! of packets, and lays them out on disk in one of two formats:
//! - `Mp4`: standalone MP4 segments, rotated at keyframes once the configured
//!   duration is reached and named from a path template
//! - `Nvr`: hourly pairs of data (`.d`) and index (`.m`) files holding
//!   keyframe-aligned groups of frames

pub mod clock;
pub mod config;
pub mod error;
pub mod gof;
pub mod identity;
pub mod index;
pub mod muxer;
pub mod packet;
pub mod template;

mod nvr;
mod recorder;
mod segment;

pub use clock::{Clock, SystemClock};
pub use config::{Config, RecorderConfig};
pub use error::{Error, Result};
pub use gof::Gof;
pub use identity::Identity;
pub use index::IndexRecord;
pub use packet::{CodecParameters, Packet, StreamParameters};
pub use recorder::Recorder;
pub use template::{PathTemplate, SegmentTiming};

use serde::Deserialize;

/// Output format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Rotating MP4 segment files
    #[default]
    Mp4,
    /// Hourly indexed group-of-frames files
    Nvr,
}
