//! Single-shot extraction: read, decode, filter, encode and mux until the
//! first key frame of the video stream has been written.
//!
//! [`Screenshot`] is the builder entry point, [`extract_with`] runs the
//! pipeline against any [`Backend`], and [`shot`] is a status-code wrapper
//! for callers that only need success or failure.
//!
//! # Example
//!
//! ```no_run
//! use keyshot::{Screenshot, ShotError};
//!
//! let report = Screenshot::new("input.mp4")
//!     .encoder("png")
//!     .timeout_millis(5000)
//!     .save("frame.png")?;
//! println!("wrote {}", report.output.display());
//! # Ok::<(), ShotError>(())
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ShotOptions;
use crate::context::PipelineContext;
use crate::decode::decode_unit;
use crate::encode::encode_frame;
use crate::error::ShotError;
use crate::filter::filter_frame;
use crate::libav::FfmpegBackend;
use crate::mux::{MuxPolicy, mux_queued_units};
use crate::stage::{Backend, CodedUnit, MediaDecoder, MediaSource};
use crate::staging::{OutputStaging, StagedOutput};

/// Summary of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotReport {
    /// Where the image was written.
    pub output: PathBuf,
    /// Index of the video stream the frame was taken from.
    pub video_stream_index: usize,
    /// Units read from the source, across all streams.
    pub units_read: usize,
    /// Units of the selected video stream fed to the decoder.
    pub video_units: usize,
    /// Key frames the decoder queued.
    pub key_frames: usize,
    /// Units written to the output container.
    pub units_written: usize,
}

#[derive(Debug, Default)]
struct PipelineCounts {
    units_read: usize,
    video_units: usize,
    key_frames: usize,
    units_written: usize,
}

/// Extract the first key frame of `input` into `output` using `backend`.
///
/// The pipeline context is closed on every path. With
/// [`OutputStaging::Staged`] the output only appears at `output` once the
/// container has been finalized.
///
/// # Errors
///
/// Any error from opening the pipeline, from one of the stages,
/// [`ShotError::InputExhausted`] if the input ends without producing an
/// encoded unit, or [`ShotError::IoError`] if the staged output cannot be
/// moved into place.
pub fn extract_with<B: Backend>(
    backend: &mut B,
    input: &str,
    output: &Path,
    options: &ShotOptions,
) -> Result<ShotReport, ShotError> {
    log::debug!(
        "Extracting key frame from {input} to {} (encoder={})",
        output.display(),
        options.encoder_name()
    );

    let staged = StagedOutput::prepare(output, options.staging());
    let mut context = PipelineContext::open(backend, input, staged.path(), options)?;
    let video_stream_index = context
        .video_stream()
        .map(|stream| stream.index)
        .ok_or(ShotError::NoVideoStream)?;

    let result = run_pipeline(&mut context, options.mux_policy());
    context.close();
    let counts = result?;

    let output = staged.commit()?;
    log::info!(
        "Saved key frame from {input} to {} after {} unit(s)",
        output.display(),
        counts.units_read
    );

    Ok(ShotReport {
        output,
        video_stream_index,
        units_read: counts.units_read,
        video_units: counts.video_units,
        key_frames: counts.key_frames,
        units_written: counts.units_written,
    })
}

fn run_pipeline<B: Backend>(
    context: &mut PipelineContext<B>,
    policy: MuxPolicy,
) -> Result<PipelineCounts, ShotError> {
    let stream = context.video_stream().cloned().ok_or(ShotError::ContextClosed)?;
    let decoder_time_base = context
        .decoder
        .as_ref()
        .ok_or(ShotError::ContextClosed)?
        .params()
        .time_base;

    let mut counts = PipelineCounts::default();
    loop {
        let Some(mut unit) = context
            .source_mut()?
            .read_unit()
            .map_err(|error| ShotError::SourceReadError(error.to_string()))?
        else {
            log::debug!(
                "Input exhausted after {} unit(s) without an encoded frame",
                counts.units_read
            );
            return Err(ShotError::InputExhausted);
        };
        counts.units_read += 1;

        if unit.stream_index() != stream.index {
            continue;
        }
        counts.video_units += 1;

        unit.rescale_ts(stream.time_base, decoder_time_base);
        counts.key_frames += transcode_unit(context, &unit)?;
        drop(unit);

        if !context.packets.is_empty() {
            counts.units_written = mux_queued_units(context, policy)?;
            return Ok(counts);
        }
    }
}

// Decode one unit, then push everything it produced through filter and
// encoder. Returns the number of key frames the decoder queued.
fn transcode_unit<B: Backend>(
    context: &mut PipelineContext<B>,
    unit: &B::Unit,
) -> Result<usize, ShotError> {
    let key_frames = decode_unit(context, unit)?;

    while let Some(frame) = context.take_decoded_frame() {
        filter_frame(context, frame)?;
    }
    while let Some(frame) = context.take_filtered_frame() {
        encode_frame(context, frame)?;
    }

    Ok(key_frames)
}

/// Builder for a single key-frame extraction.
#[derive(Debug, Clone)]
pub struct Screenshot {
    input: String,
    options: ShotOptions,
}

impl Screenshot {
    /// Start an extraction from a file path or URL.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            options: ShotOptions::new(),
        }
    }

    /// Set the encoder by FFmpeg name.
    #[must_use]
    pub fn encoder(mut self, name: impl Into<String>) -> Self {
        self.options = self.options.with_encoder(name);
        self
    }

    /// Set the source read timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_timeout(timeout);
        self
    }

    /// Set the source read timeout in milliseconds. Zero disables it.
    #[must_use]
    pub fn timeout_millis(mut self, millis: u64) -> Self {
        self.options = self.options.with_timeout_millis(millis);
        self
    }

    /// Replace the identity filter graph.
    #[must_use]
    pub fn filter(mut self, spec: impl Into<String>) -> Self {
        self.options = self.options.with_filter(spec);
        self
    }

    /// Choose how many encoded units are written.
    #[must_use]
    pub fn mux_policy(mut self, policy: MuxPolicy) -> Self {
        self.options = self.options.with_mux_policy(policy);
        self
    }

    /// Choose whether the output is staged.
    #[must_use]
    pub fn staging(mut self, staging: OutputStaging) -> Self {
        self.options = self.options.with_staging(staging);
        self
    }

    /// Replace every option at once.
    #[must_use]
    pub fn with_options(mut self, options: ShotOptions) -> Self {
        self.options = options;
        self
    }

    /// Input locator.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Current options.
    pub fn options(&self) -> &ShotOptions {
        &self.options
    }

    /// Run the extraction with FFmpeg and write the image to `output`.
    ///
    /// # Errors
    ///
    /// See [`extract_with`].
    pub fn save<P: AsRef<Path>>(&self, output: P) -> Result<ShotReport, ShotError> {
        let mut backend = FfmpegBackend::new();
        self.save_with(&mut backend, output)
    }

    /// Run the extraction with a caller-provided backend.
    ///
    /// # Errors
    ///
    /// See [`extract_with`].
    pub fn save_with<B: Backend, P: AsRef<Path>>(
        &self,
        backend: &mut B,
        output: P,
    ) -> Result<ShotReport, ShotError> {
        extract_with(backend, &self.input, output.as_ref(), &self.options)
    }
}

/// Extract the first key frame of `input` into `output` with FFmpeg.
///
/// `timeout_ms` bounds how long connecting to the source may block; zero
/// disables it. Returns `0` on success and `-1` on any failure, which is
/// logged.
pub fn shot<P: AsRef<Path>>(input: &str, encoder_name: &str, output: P, timeout_ms: u64) -> i32 {
    let result = Screenshot::new(input)
        .encoder(encoder_name)
        .timeout_millis(timeout_ms)
        .save(output);

    status_code(input, result)
}

fn status_code(input: &str, result: Result<ShotReport, ShotError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(error) if error.is_open_failure() => {
            log::warn!("Could not set up extraction for {input}: {error}");
            -1
        }
        Err(ShotError::InputExhausted) => {
            log::warn!("No key frame could be encoded from {input}");
            -1
        }
        Err(error) => {
            log::warn!("Extraction from {input} failed: {error}");
            -1
        }
    }
}
