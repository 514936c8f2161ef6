//! FFmpeg implementation of the pipeline collaborators.
//!
//! [`FfmpegBackend`] opens each collaborator on top of `ffmpeg-next`.
//! Coded units are [`Packet`]s and frames are untyped
//! [`ffmpeg_next::Frame`]s, so the same pipeline code handles video and audio
//! streams.

mod decoder;
mod encoder;
mod filter_graph;
mod sink;
mod source;

use std::path::Path;

use ffmpeg_next::{Error as FfmpegError, Frame, Packet, Rational};

pub use decoder::FfmpegDecoder;
pub use encoder::FfmpegEncoder;
pub use filter_graph::FfmpegFilterGraph;
pub use sink::FfmpegSink;
pub use source::FfmpegSource;

use crate::config::SourceOptions;
use crate::stage::{Backend, CodecParams, CodedUnit, Pull, StageFrame, StreamInfo};

/// Production backend: every collaborator is an FFmpeg object.
#[derive(Debug, Default)]
pub struct FfmpegBackend {
    initialized: bool,
}

impl FfmpegBackend {
    /// Create a backend. FFmpeg itself is initialized lazily, on the first
    /// source open.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_initialized(&mut self) -> Result<(), FfmpegError> {
        if !self.initialized {
            ffmpeg_next::init()?;
            self.initialized = true;
        }
        Ok(())
    }
}

impl Backend for FfmpegBackend {
    type Unit = Packet;
    type Frame = Frame;
    type Source = FfmpegSource;
    type Decoder = FfmpegDecoder;
    type Encoder = FfmpegEncoder;
    type Filter = FfmpegFilterGraph;
    type Sink = FfmpegSink;

    fn open_source(
        &mut self,
        locator: &str,
        options: &SourceOptions,
    ) -> Result<FfmpegSource, FfmpegError> {
        self.ensure_initialized()?;
        FfmpegSource::open(locator, options)
    }

    fn open_decoder(
        &mut self,
        source: &FfmpegSource,
        stream: &StreamInfo,
    ) -> Result<FfmpegDecoder, FfmpegError> {
        FfmpegDecoder::open(source, stream)
    }

    fn open_encoder(
        &mut self,
        name: &str,
        decoder: &CodecParams,
    ) -> Result<FfmpegEncoder, FfmpegError> {
        FfmpegEncoder::open(name, decoder)
    }

    fn open_filter(
        &mut self,
        spec: &str,
        decoder: &CodecParams,
        encoder: &CodecParams,
    ) -> Result<FfmpegFilterGraph, FfmpegError> {
        FfmpegFilterGraph::build(spec, decoder, encoder)
    }

    fn open_sink(
        &mut self,
        locator: &Path,
        encoder: &mut FfmpegEncoder,
    ) -> Result<FfmpegSink, FfmpegError> {
        FfmpegSink::open(locator, encoder)
    }
}

impl CodedUnit for Packet {
    fn stream_index(&self) -> usize {
        self.stream()
    }

    fn set_stream_index(&mut self, index: usize) {
        self.set_stream(index);
    }

    fn rescale_ts(&mut self, from: Rational, to: Rational) {
        Packet::rescale_ts(self, from, to);
    }
}

impl StageFrame for Frame {
    fn is_key(&self) -> bool {
        Frame::is_key(self)
    }

    fn best_effort_timestamp(&self) -> Option<i64> {
        Frame::timestamp(self)
    }

    fn set_pts(&mut self, pts: Option<i64>) {
        Frame::set_pts(self, pts);
    }

    fn clear_picture_type(&mut self) {
        unsafe {
            (*self.as_mut_ptr()).pict_type = ffmpeg_sys_next::AVPictureType::AV_PICTURE_TYPE_NONE;
        }
    }
}

// Map a send/receive return onto the drain protocol: EAGAIN asks for more
// input, EOF ends the stream.
fn pull_status<T>(result: Result<(), FfmpegError>, item: impl FnOnce() -> T) -> Result<Pull<T>, FfmpegError> {
    match result {
        Ok(()) => Ok(Pull::Ready(item())),
        Err(FfmpegError::Eof) => Ok(Pull::EndOfStream),
        Err(FfmpegError::Other { errno }) if errno == ffmpeg_sys_next::EAGAIN as i32 => {
            Ok(Pull::NeedMoreInput)
        }
        Err(error) => Err(error),
    }
}

fn empty_frame() -> Frame {
    unsafe { Frame::empty() }
}
