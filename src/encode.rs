//! Encode stage and encoder configuration.

use ffmpeg_next::Rational;
use ffmpeg_next::format::{Pixel, Sample};

use crate::context::PipelineContext;
use crate::error::ShotError;
use crate::stage::{AudioFormat, Backend, CodecParams, MediaEncoder, Pull, StreamFormat};

/// Derive the encoder's input parameters from the decoder's output.
///
/// Video keeps the decoder's dimensions and aspect ratio. The pixel format
/// is the first one the encoder advertises, or the decoder's when the
/// encoder advertises none. The time base is the inverse of the decoder frame
/// rate, or the decoder time base when no frame rate is known.
///
/// Audio keeps rate and layout, picks the encoder's first sample format (or
/// the decoder's) and uses a `1/sample_rate` time base.
pub fn derive_encoder_params(
    decoder: &CodecParams,
    pixel_formats: Option<&[Pixel]>,
    sample_formats: Option<&[Sample]>,
) -> CodecParams {
    match decoder.format {
        StreamFormat::Video(mut video) => {
            if let Some(&first) = pixel_formats.and_then(|formats| formats.first()) {
                video.pixel_format = first;
            }
            let time_base = decoder
                .frame_rate
                .filter(|rate| rate.numerator() > 0 && rate.denominator() > 0)
                .map(|rate| rate.invert())
                .unwrap_or(decoder.time_base);

            CodecParams {
                format: StreamFormat::Video(video),
                time_base,
                frame_rate: decoder.frame_rate,
            }
        }
        StreamFormat::Audio(audio) => {
            let sample_format = sample_formats
                .and_then(|formats| formats.first())
                .copied()
                .unwrap_or(audio.sample_format);
            let time_base = Rational::new(1, i32::try_from(audio.sample_rate).unwrap_or(i32::MAX));

            CodecParams {
                format: StreamFormat::Audio(AudioFormat {
                    sample_format,
                    ..audio
                }),
                time_base,
                frame_rate: None,
            }
        }
    }
}

/// Feed one filtered frame to the encoder and queue every coded unit it
/// yields.
///
/// The frame is consumed and released before this returns on every path.
///
/// Returns the number of units queued.
///
/// # Errors
///
/// - [`ShotError::EncodeSubmitError`] if the encoder rejects the frame.
/// - [`ShotError::EncodeReceiveError`] if draining the encoder fails.
/// - [`ShotError::ContextClosed`] if the context was already closed.
pub fn encode_frame<B: Backend>(
    context: &mut PipelineContext<B>,
    frame: B::Frame,
) -> Result<usize, ShotError> {
    let encoder = context.encoder.as_mut().ok_or(ShotError::ContextClosed)?;

    let submitted = encoder.submit(&frame);
    drop(frame);
    submitted.map_err(|error| ShotError::EncodeSubmitError(error.to_string()))?;

    let mut queued = 0;
    loop {
        match encoder.receive_unit() {
            Ok(Pull::Ready(unit)) => {
                context.packets.push(unit);
                queued += 1;
            }
            Ok(Pull::NeedMoreInput | Pull::EndOfStream) => break,
            Err(error) => return Err(ShotError::EncodeReceiveError(error.to_string())),
        }
    }

    if queued > 0 {
        log::debug!("Encoder queued {queued} unit(s)");
    }
    Ok(queued)
}
