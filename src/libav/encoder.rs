use ffmpeg_next::codec::context::Context as CodecContext;
use ffmpeg_next::codec::encoder;
use ffmpeg_next::format::{Pixel, Sample};
use ffmpeg_next::format::stream::StreamMut;
use ffmpeg_next::{Codec, Error as FfmpegError, Frame, Packet};

use super::pull_status;
use crate::encode::derive_encoder_params;
use crate::stage::{CodecParams, MediaEncoder, MediaKind, Pull, StreamFormat};

enum OpenedEncoder {
    Video(encoder::video::Encoder),
    Audio(encoder::audio::Encoder),
}

/// Opened FFmpeg encoder, looked up by name.
pub struct FfmpegEncoder {
    encoder: OpenedEncoder,
    codec: Codec,
    params: CodecParams,
}

impl FfmpegEncoder {
    pub(super) fn open(name: &str, decoder: &CodecParams) -> Result<Self, FfmpegError> {
        let codec = encoder::find_by_name(name).ok_or(FfmpegError::EncoderNotFound)?;

        let (encoder, params) = match decoder.kind() {
            MediaKind::Audio => {
                let sample_formats: Option<Vec<Sample>> =
                    codec.audio()?.formats().map(|formats| formats.collect());
                let params = derive_encoder_params(decoder, None, sample_formats.as_deref());
                let StreamFormat::Audio(format) = params.format else {
                    return Err(FfmpegError::InvalidData);
                };

                let mut audio = CodecContext::new_with_codec(codec).encoder().audio()?;
                audio.set_rate(i32::try_from(format.sample_rate).unwrap_or(i32::MAX));
                audio.set_channel_layout(format.channel_layout);
                audio.set_format(format.sample_format);
                audio.set_time_base(params.time_base);

                (OpenedEncoder::Audio(audio.open_as(codec)?), params)
            }
            _ => {
                let pixel_formats: Option<Vec<Pixel>> =
                    codec.video()?.formats().map(|formats| formats.collect());
                let params = derive_encoder_params(decoder, pixel_formats.as_deref(), None);
                let StreamFormat::Video(format) = params.format else {
                    return Err(FfmpegError::InvalidData);
                };

                let mut video = CodecContext::new_with_codec(codec).encoder().video()?;
                video.set_width(format.width);
                video.set_height(format.height);
                video.set_aspect_ratio(format.aspect_ratio);
                video.set_format(format.pixel_format);
                video.set_time_base(params.time_base);
                video.set_frame_rate(params.frame_rate);

                (OpenedEncoder::Video(video.open_as(codec)?), params)
            }
        };

        log::debug!(
            "Opened encoder {} (time base {})",
            codec.name(),
            params.time_base
        );
        Ok(Self {
            encoder,
            codec,
            params,
        })
    }

    pub(super) fn codec(&self) -> Codec {
        self.codec
    }

    pub(super) fn copy_parameters_to(&self, stream: &mut StreamMut<'_>) {
        match &self.encoder {
            OpenedEncoder::Video(encoder) => stream.set_parameters(encoder),
            OpenedEncoder::Audio(encoder) => stream.set_parameters(encoder),
        }
        stream.set_time_base(self.params.time_base);
    }
}

impl MediaEncoder for FfmpegEncoder {
    type Frame = Frame;
    type Unit = Packet;

    fn params(&self) -> &CodecParams {
        &self.params
    }

    fn submit(&mut self, frame: &Frame) -> Result<(), FfmpegError> {
        match &mut self.encoder {
            OpenedEncoder::Video(encoder) => encoder.send_frame(frame),
            OpenedEncoder::Audio(encoder) => encoder.send_frame(frame),
        }
    }

    fn receive_unit(&mut self) -> Result<Pull<Packet>, FfmpegError> {
        let mut packet = Packet::empty();
        let result = match &mut self.encoder {
            OpenedEncoder::Video(encoder) => encoder.receive_packet(&mut packet),
            OpenedEncoder::Audio(encoder) => encoder.receive_packet(&mut packet),
        };
        pull_status(result, || packet)
    }

    fn request_global_header(&mut self) {
        let flag = ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
        unsafe {
            match &mut self.encoder {
                OpenedEncoder::Video(encoder) => (*encoder.as_mut_ptr()).flags |= flag,
                OpenedEncoder::Audio(encoder) => (*encoder.as_mut_ptr()).flags |= flag,
            }
        }
    }
}
