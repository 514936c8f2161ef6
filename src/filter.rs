//! Filter stage and filter-graph helpers.

use std::fmt::Write;

use crate::context::PipelineContext;
use crate::error::ShotError;
use crate::stage::{Backend, CodecParams, FrameFilter, MediaKind, Pull, StageFrame, StreamFormat};

/// Identity graph for the given media kind: `null` for video, `anull` for
/// audio.
pub fn default_filter_spec(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Audio => "anull",
        _ => "null",
    }
}

/// Arguments for the graph's `buffer`/`abuffer` source node, describing the
/// frames the decoder produces.
///
/// Video: `video_size=WxH:pix_fmt=N:time_base=A/B:pixel_aspect=C/D`.
/// Audio: `time_base=A/B:sample_rate=R:sample_fmt=NAME:channel_layout=0xHEX`.
pub fn buffer_source_args(decoder: &CodecParams) -> String {
    let time_base = decoder.time_base;
    match decoder.format {
        StreamFormat::Video(video) => {
            let pixel_format: ffmpeg_sys_next::AVPixelFormat = video.pixel_format.into();
            format!(
                "video_size={}x{}:pix_fmt={}:time_base={}/{}:pixel_aspect={}/{}",
                video.width,
                video.height,
                pixel_format as i32,
                time_base.numerator(),
                time_base.denominator(),
                video.aspect_ratio.numerator(),
                video.aspect_ratio.denominator(),
            )
        }
        StreamFormat::Audio(audio) => {
            let mut args = format!(
                "time_base={}/{}:sample_rate={}:sample_fmt={}",
                time_base.numerator(),
                time_base.denominator(),
                audio.sample_rate,
                audio.sample_format.name(),
            );
            let _ = write!(args, ":channel_layout=0x{:x}", audio.channel_layout.bits());
            args
        }
    }
}

/// Name of the graph's source filter for the given parameters.
pub fn buffer_source_name(decoder: &CodecParams) -> &'static str {
    match decoder.kind() {
        MediaKind::Audio => "abuffer",
        _ => "buffer",
    }
}

/// Name of the graph's sink filter for the given parameters.
pub fn buffer_sink_name(encoder: &CodecParams) -> &'static str {
    match encoder.kind() {
        MediaKind::Audio => "abuffersink",
        _ => "buffersink",
    }
}

/// Push one decoded frame through the filter graph and queue everything the
/// graph produces.
///
/// The frame is consumed; it is released before this returns, whether the
/// graph accepted it or not. Filtered frames have their picture type cleared
/// so the encoder picks its own.
///
/// Returns the number of filtered frames queued.
///
/// # Errors
///
/// - [`ShotError::FilterSubmitError`] if the graph rejects the frame.
/// - [`ShotError::FilterReceiveError`] if draining the graph fails.
/// - [`ShotError::ContextClosed`] if the context was already closed.
pub fn filter_frame<B: Backend>(
    context: &mut PipelineContext<B>,
    frame: B::Frame,
) -> Result<usize, ShotError> {
    let filter = context.filter.as_mut().ok_or(ShotError::ContextClosed)?;

    let submitted = filter.submit(&frame);
    drop(frame);
    submitted.map_err(|error| ShotError::FilterSubmitError(error.to_string()))?;

    let mut queued = 0;
    loop {
        match filter.receive() {
            Ok(Pull::Ready(mut filtered)) => {
                filtered.clear_picture_type();
                context.filtered_frames.push(filtered);
                queued += 1;
            }
            Ok(Pull::NeedMoreInput | Pull::EndOfStream) => break,
            Err(error) => return Err(ShotError::FilterReceiveError(error.to_string())),
        }
    }

    Ok(queued)
}
