use ffmpeg_next::codec::context::Context as CodecContext;
use ffmpeg_next::codec::decoder::Opened;
use ffmpeg_next::{ChannelLayout, Error as FfmpegError, Frame, Packet, Rational};

use super::source::FfmpegSource;
use super::{empty_frame, pull_status};
use crate::stage::{
    AudioFormat, CodecParams, MediaDecoder, MediaKind, Pull, StreamFormat, StreamInfo, VideoFormat,
};

/// Opened FFmpeg decoder for one input stream.
pub struct FfmpegDecoder {
    decoder: Opened,
    params: CodecParams,
}

impl FfmpegDecoder {
    pub(super) fn open(source: &FfmpegSource, info: &StreamInfo) -> Result<Self, FfmpegError> {
        let stream = source
            .input()
            .stream(info.index)
            .ok_or(FfmpegError::StreamNotFound)?;
        let time_base = stream.time_base();
        let frame_rate = guess_frame_rate(stream.rate(), stream.avg_frame_rate());

        let mut context = CodecContext::from_parameters(stream.parameters())?;
        unsafe {
            let raw = context.as_mut_ptr();
            (*raw).time_base = time_base.into();
            (*raw).pkt_timebase = time_base.into();
        }

        let (decoder, format) = match info.kind {
            MediaKind::Video => {
                let video = context.decoder().video()?;
                let format = StreamFormat::Video(VideoFormat {
                    width: video.width(),
                    height: video.height(),
                    pixel_format: video.format(),
                    aspect_ratio: video.aspect_ratio(),
                });
                (video.0, format)
            }
            MediaKind::Audio => {
                let audio = context.decoder().audio()?;
                let channels = u16::try_from(audio.channels()).unwrap_or(0);
                let channel_layout = if audio.channel_layout().is_empty() {
                    ChannelLayout::default(i32::from(channels))
                } else {
                    audio.channel_layout()
                };
                let format = StreamFormat::Audio(AudioFormat {
                    sample_rate: audio.rate(),
                    sample_format: audio.format(),
                    channel_layout,
                    channels,
                });
                (audio.0, format)
            }
            MediaKind::Other => return Err(FfmpegError::DecoderNotFound),
        };

        log::debug!("Opened {:?} decoder for stream {}", info.codec, info.index);
        Ok(Self {
            decoder,
            params: CodecParams {
                format,
                time_base,
                frame_rate: match info.kind {
                    MediaKind::Video => frame_rate,
                    _ => None,
                },
            },
        })
    }
}

// Prefer the container's real base rate, then the average rate.
fn guess_frame_rate(real: Rational, average: Rational) -> Option<Rational> {
    [real, average]
        .into_iter()
        .find(|rate| rate.numerator() > 0 && rate.denominator() > 0)
}

impl MediaDecoder for FfmpegDecoder {
    type Unit = Packet;
    type Frame = Frame;

    fn params(&self) -> &CodecParams {
        &self.params
    }

    fn submit(&mut self, unit: &Packet) -> Result<(), FfmpegError> {
        self.decoder.send_packet(unit)
    }

    fn receive_frame(&mut self) -> Result<Pull<Frame>, FfmpegError> {
        let mut frame = empty_frame();
        let result = self.decoder.receive_frame(&mut frame);
        pull_status(result, || frame)
    }
}
