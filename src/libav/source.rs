use ffmpeg_next::format::context::Input;
use ffmpeg_next::media::Type;
use ffmpeg_next::{Dictionary, Error as FfmpegError, Packet};

use crate::config::SourceOptions;
use crate::stage::{MediaKind, MediaSource, StreamInfo};

/// Demuxer over an FFmpeg input context.
pub struct FfmpegSource {
    input: Input,
}

impl FfmpegSource {
    pub(super) fn open(locator: &str, options: &SourceOptions) -> Result<Self, FfmpegError> {
        let input = match options.timeout_micros() {
            Some(micros) => {
                let mut dictionary = Dictionary::new();
                dictionary.set("timeout", &micros.to_string());
                ffmpeg_next::format::input_with_dictionary(locator, dictionary)?
            }
            None => ffmpeg_next::format::input(locator)?,
        };
        log::debug!(
            "Opened {locator} as {} with {} stream(s)",
            input.format().name(),
            input.nb_streams()
        );

        Ok(Self { input })
    }

    pub(super) fn input(&self) -> &Input {
        &self.input
    }
}

impl MediaSource for FfmpegSource {
    type Unit = Packet;

    fn streams(&self) -> Vec<StreamInfo> {
        self.input
            .streams()
            .map(|stream| {
                let parameters = stream.parameters();
                let kind = match parameters.medium() {
                    Type::Video => MediaKind::Video,
                    Type::Audio => MediaKind::Audio,
                    _ => MediaKind::Other,
                };
                StreamInfo {
                    index: stream.index(),
                    kind,
                    codec: parameters.id(),
                    time_base: stream.time_base(),
                }
            })
            .collect()
    }

    fn read_unit(&mut self) -> Result<Option<Packet>, FfmpegError> {
        let mut packet = Packet::empty();
        match packet.read(&mut self.input) {
            Ok(()) => Ok(Some(packet)),
            Err(FfmpegError::Eof) => Ok(None),
            Err(error) => Err(error),
        }
    }
}
