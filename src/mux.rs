//! Mux stage: write queued coded units into the output container.

use crate::context::PipelineContext;
use crate::error::ShotError;
use crate::stage::{Backend, CodedUnit, MediaDecoder, MediaEncoder, MediaSink};

/// How many queued units the mux stage writes before the trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MuxPolicy {
    /// Write exactly one unit, the oldest. Anything else queued stays in the
    /// queue and is released when the context closes.
    #[default]
    FirstUnit,
    /// Write every queued unit.
    AllQueued,
}

/// Write queued units to the sink and finalize the container.
///
/// Each written unit is re-tagged with stream index 0 (the only output
/// stream) and rescaled from the encoder time base to the decoder time base.
///
/// Returns the number of units written.
///
/// # Errors
///
/// - [`ShotError::EmptyPacketQueue`] if nothing is queued.
/// - [`ShotError::MuxWriteError`] if a unit or the trailer cannot be written.
/// - [`ShotError::ContextClosed`] if the context was already closed.
pub fn mux_queued_units<B: Backend>(
    context: &mut PipelineContext<B>,
    policy: MuxPolicy,
) -> Result<usize, ShotError> {
    if context.packets.is_empty() {
        return Err(ShotError::EmptyPacketQueue);
    }

    let encoder_time_base = context
        .encoder
        .as_ref()
        .ok_or(ShotError::ContextClosed)?
        .params()
        .time_base;
    let decoder_time_base = context
        .decoder
        .as_ref()
        .ok_or(ShotError::ContextClosed)?
        .params()
        .time_base;
    let sink = context.sink.as_mut().ok_or(ShotError::ContextClosed)?;

    log::debug!(
        "Muxing {} queued unit(s) with policy {policy:?}",
        context.packets.len()
    );

    let mut written = 0;
    while let Some(mut unit) = context.packets.pop() {
        unit.set_stream_index(0);
        unit.rescale_ts(encoder_time_base, decoder_time_base);
        sink.write_interleaved(unit)
            .map_err(|error| ShotError::MuxWriteError(error.to_string()))?;
        written += 1;

        if policy == MuxPolicy::FirstUnit {
            break;
        }
    }

    sink.write_trailer()
        .map_err(|error| ShotError::MuxWriteError(error.to_string()))?;

    log::info!("Wrote {written} unit(s) to {}", context.output.display());
    Ok(written)
}
