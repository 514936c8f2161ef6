//! Error types for the `keyshot` crate.
//!
//! [`ShotError`] is returned by every fallible operation. Variants map one to
//! one onto the points where an extraction can fail: opening one of the five
//! pipeline collaborators, feeding or draining a stage, or finalizing the
//! output. Each carries the upstream reason so a caller can report the
//! failure without extra logging.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `keyshot` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShotError {
    /// The input could not be opened or probed.
    #[error("Failed to open input {locator}: {reason}")]
    SourceOpenError {
        /// Path or URL that was passed as input.
        locator: String,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The input has no video stream to take a frame from.
    #[error("No video stream found in input")]
    NoVideoStream,

    /// No decoder is registered for the video codec, or it failed to open.
    #[error("Failed to open decoder: {0}")]
    DecoderOpenError(String),

    /// The requested encoder does not exist or could not be initialized.
    #[error("Failed to open encoder {encoder}: {reason}")]
    EncoderOpenError {
        /// Encoder name that was requested.
        encoder: String,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The filter graph between decoder and encoder could not be built.
    #[error("Filter graph error: {0}")]
    FilterGraphError(String),

    /// The output container could not be created or its header written.
    #[error("Failed to open output {locator}: {reason}")]
    MuxOpenError {
        /// Path the container was opened at.
        locator: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The decoder rejected a coded unit.
    #[error("Failed to submit packet to decoder: {0}")]
    DecodeSubmitError(String),

    /// The decoder failed while producing frames.
    #[error("Failed to receive frame from decoder: {0}")]
    DecodeReceiveError(String),

    /// The filter graph rejected a decoded frame.
    #[error("Failed to submit frame to filter graph: {0}")]
    FilterSubmitError(String),

    /// The filter graph failed while producing frames.
    #[error("Failed to receive frame from filter graph: {0}")]
    FilterReceiveError(String),

    /// The encoder rejected a filtered frame.
    #[error("Failed to submit frame to encoder: {0}")]
    EncodeSubmitError(String),

    /// The encoder failed while producing coded units.
    #[error("Failed to receive packet from encoder: {0}")]
    EncodeReceiveError(String),

    /// Reading the next unit from the input failed.
    #[error("Failed to read from input: {0}")]
    SourceReadError(String),

    /// Writing a unit or the trailer to the output container failed.
    #[error("Failed to write output: {0}")]
    MuxWriteError(String),

    /// The mux stage ran with nothing to write.
    #[error("No encoded packet is queued for muxing")]
    EmptyPacketQueue,

    /// The input ended before any key frame could be encoded.
    #[error("Input ended before a key frame was produced")]
    InputExhausted,

    /// A stage ran against a context whose handles were already released.
    #[error("Pipeline context is closed")]
    ContextClosed,

    /// An I/O error occurred while staging or committing the output file.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error originating from the FFmpeg libraries outside a named stage.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),
}

impl From<FfmpegError> for ShotError {
    fn from(error: FfmpegError) -> Self {
        ShotError::FfmpegError(error.to_string())
    }
}

impl ShotError {
    /// Returns `true` for failures that happened while the pipeline context
    /// was being opened, before any input was read.
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            ShotError::SourceOpenError { .. }
                | ShotError::NoVideoStream
                | ShotError::DecoderOpenError(_)
                | ShotError::EncoderOpenError { .. }
                | ShotError::FilterGraphError(_)
                | ShotError::MuxOpenError { .. }
        )
    }
}
