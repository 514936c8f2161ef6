//! Decode stage.

use crate::context::PipelineContext;
use crate::error::ShotError;
use crate::stage::{Backend, MediaDecoder, Pull, StageFrame};

/// Feed one coded unit of the selected stream to the decoder and queue every
/// key frame it yields.
///
/// The unit's timestamps must already be in the decoder time base. Queued
/// frames get their presentation timestamp from the decoder's best-effort
/// timestamp. Frames that are not key frames are dropped on the spot.
///
/// Returns the number of frames queued.
///
/// # Errors
///
/// - [`ShotError::DecodeSubmitError`] if the decoder rejects the unit.
/// - [`ShotError::DecodeReceiveError`] if draining the decoder fails.
/// - [`ShotError::ContextClosed`] if the context was already closed.
pub fn decode_unit<B: Backend>(
    context: &mut PipelineContext<B>,
    unit: &B::Unit,
) -> Result<usize, ShotError> {
    let decoder = context.decoder.as_mut().ok_or(ShotError::ContextClosed)?;

    decoder
        .submit(unit)
        .map_err(|error| ShotError::DecodeSubmitError(error.to_string()))?;

    let mut queued = 0;
    loop {
        match decoder.receive_frame() {
            Ok(Pull::Ready(mut frame)) => {
                if !frame.is_key() {
                    log::trace!("Skipping non-key frame");
                    continue;
                }
                let timestamp = frame.best_effort_timestamp();
                frame.set_pts(timestamp);
                context.frames.push(frame);
                queued += 1;
            }
            Ok(Pull::NeedMoreInput | Pull::EndOfStream) => break,
            Err(error) => return Err(ShotError::DecodeReceiveError(error.to_string())),
        }
    }

    if queued > 0 {
        log::debug!("Decoder queued {queued} key frame(s)");
    }
    Ok(queued)
}
