//! Container muxers
//!
//! The segment writer treats a muxer as an opaque sink. Per segment it calls
//! `write_header` once, then `write_packet` any number of times, then
//! `write_trailer`, which consumes the muxer.

pub mod mp4;

use crate::packet::{Packet, StreamParameters};
use crate::Result;
use std::fs::File;

/// Container muxer trait
pub trait Muxer: Send {
    /// Write the container header for the given streams
    fn write_header(&mut self, streams: &[StreamParameters]) -> Result<()>;

    /// Write an encoded packet
    fn write_packet(&mut self, packet: &Packet) -> Result<()>;

    /// Finalize the container and flush the output file
    fn write_trailer(self: Box<Self>) -> Result<()>;
}

/// Builds a muxer writing into a freshly created segment file
pub type MuxerFactory = Box<dyn FnMut(File) -> Result<Box<dyn Muxer>> + Send>;

/// Factory producing [`mp4::Mp4Muxer`]s
pub fn mp4_factory() -> MuxerFactory {
    Box::new(|file| Ok(Box::new(mp4::Mp4Muxer::new(file)) as Box<dyn Muxer>))
}
