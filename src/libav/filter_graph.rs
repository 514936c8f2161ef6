use ffmpeg_next::filter::Graph;
use ffmpeg_next::{Error as FfmpegError, Frame};

use super::{empty_frame, pull_status};
use crate::filter::{buffer_sink_name, buffer_source_args, buffer_source_name};
use crate::stage::{CodecParams, FrameFilter, Pull, StreamFormat};

const SOURCE_NODE: &str = "in";
const SINK_NODE: &str = "out";

/// Configured FFmpeg filter graph with one source and one sink.
pub struct FfmpegFilterGraph {
    graph: Graph,
}

impl FfmpegFilterGraph {
    // The graph is dropped, and with it every node and the parsed
    // inputs/outputs, on any early return.
    pub(super) fn build(
        spec: &str,
        decoder: &CodecParams,
        encoder: &CodecParams,
    ) -> Result<Self, FfmpegError> {
        let mut graph = Graph::new();

        let source_filter =
            ffmpeg_next::filter::find(buffer_source_name(decoder)).ok_or(FfmpegError::FilterNotFound)?;
        let sink_filter =
            ffmpeg_next::filter::find(buffer_sink_name(encoder)).ok_or(FfmpegError::FilterNotFound)?;

        let args = buffer_source_args(decoder);
        log::debug!("Filter source arguments: {args}");
        graph.add(&source_filter, SOURCE_NODE, &args)?;
        graph.add(&sink_filter, SINK_NODE, "")?;

        {
            let mut sink = graph.get(SINK_NODE).ok_or(FfmpegError::FilterNotFound)?;
            match encoder.format {
                StreamFormat::Video(video) => sink.set_pixel_format(video.pixel_format),
                StreamFormat::Audio(audio) => {
                    sink.set_sample_format(audio.sample_format);
                    sink.set_channel_layout(audio.channel_layout);
                    sink.set_sample_rate(audio.sample_rate);
                }
            }
        }

        graph
            .output(SOURCE_NODE, 0)?
            .input(SINK_NODE, 0)?
            .parse(spec)?;
        graph.validate()?;

        Ok(Self { graph })
    }
}

impl FrameFilter for FfmpegFilterGraph {
    type Frame = Frame;

    fn submit(&mut self, frame: &Frame) -> Result<(), FfmpegError> {
        self.graph
            .get(SOURCE_NODE)
            .ok_or(FfmpegError::FilterNotFound)?
            .source()
            .add(frame)
    }

    fn receive(&mut self) -> Result<Pull<Frame>, FfmpegError> {
        let mut frame = empty_frame();
        let result = self
            .graph
            .get(SINK_NODE)
            .ok_or(FfmpegError::FilterNotFound)?
            .sink()
            .frame(&mut frame);
        pull_status(result, || frame)
    }
}
