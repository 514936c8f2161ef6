//! Pipeline context and its lifecycle.
//!
//! A [`PipelineContext`] owns everything one extraction touches: the five
//! collaborator handles, the three inter-stage queues and the source options.
//! [`PipelineContext::open`] acquires the collaborators in dependency order
//! (source, decoder, encoder, filter graph, sink). [`PipelineContext::close`]
//! releases whatever is present in the reverse order, then drains the
//! queues. Close is total and idempotent: it does not care how far `open`
//! got, and it also runs from `Drop`.

use std::path::{Path, PathBuf};

use crate::config::{ShotOptions, SourceOptions};
use crate::error::ShotError;
use crate::filter::default_filter_spec;
use crate::queue::BufferQueue;
use crate::stage::{Backend, MediaDecoder, MediaEncoder, MediaKind, MediaSink, MediaSource, StreamInfo};

/// Everything one extraction owns.
pub struct PipelineContext<B: Backend> {
    pub(crate) input: String,
    pub(crate) encoder_name: String,
    pub(crate) output: PathBuf,
    pub(crate) video_stream: Option<StreamInfo>,
    pub(crate) source: Option<B::Source>,
    pub(crate) decoder: Option<B::Decoder>,
    pub(crate) encoder: Option<B::Encoder>,
    pub(crate) filter: Option<B::Filter>,
    pub(crate) sink: Option<B::Sink>,
    pub(crate) frames: BufferQueue<B::Frame>,
    pub(crate) filtered_frames: BufferQueue<B::Frame>,
    pub(crate) packets: BufferQueue<B::Unit>,
    pub(crate) options: SourceOptions,
    closed: bool,
}

impl<B: Backend> std::fmt::Debug for PipelineContext<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("input", &self.input)
            .field("encoder_name", &self.encoder_name)
            .field("output", &self.output)
            .field("video_stream", &self.video_stream)
            .field("has_source", &self.source.is_some())
            .field("has_decoder", &self.decoder.is_some())
            .field("has_encoder", &self.encoder.is_some())
            .field("has_filter", &self.filter.is_some())
            .field("has_sink", &self.sink.is_some())
            .field("decoded_frames", &self.frames.len())
            .field("filtered_frames", &self.filtered_frames.len())
            .field("encoded_packets", &self.packets.len())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<B: Backend> PipelineContext<B> {
    /// Open every collaborator needed to extract a frame from `input` into
    /// `output`.
    ///
    /// On failure, whatever was already opened is closed before the error
    /// is returned.
    ///
    /// # Errors
    ///
    /// - [`ShotError::SourceOpenError`] if the input cannot be opened.
    /// - [`ShotError::NoVideoStream`] if the input has no video stream.
    /// - [`ShotError::DecoderOpenError`], [`ShotError::EncoderOpenError`],
    ///   [`ShotError::FilterGraphError`] or [`ShotError::MuxOpenError`] when
    ///   the corresponding collaborator fails to open.
    pub fn open(
        backend: &mut B,
        input: &str,
        output: &Path,
        options: &ShotOptions,
    ) -> Result<Self, ShotError> {
        let mut context = Self {
            input: input.to_string(),
            encoder_name: options.encoder_name().to_string(),
            output: output.to_path_buf(),
            video_stream: None,
            source: None,
            decoder: None,
            encoder: None,
            filter: None,
            sink: None,
            frames: BufferQueue::new(),
            filtered_frames: BufferQueue::new(),
            packets: BufferQueue::new(),
            options: SourceOptions::for_input(input, options.timeout()),
            closed: false,
        };

        match context.open_collaborators(backend, options.filter_spec()) {
            Ok(()) => Ok(context),
            Err(error) => {
                log::debug!("Opening pipeline for {input} failed: {error}");
                context.close();
                Err(error)
            }
        }
    }

    fn open_collaborators(
        &mut self,
        backend: &mut B,
        filter_spec: Option<&str>,
    ) -> Result<(), ShotError> {
        log::debug!(
            "Opening source {} (timeout={:?})",
            self.input,
            self.options.timeout()
        );
        let source = backend
            .open_source(&self.input, &self.options)
            .map_err(|error| ShotError::SourceOpenError {
                locator: self.input.clone(),
                reason: error.to_string(),
            })?;
        let streams = source.streams();
        let source = self.source.insert(source);

        let stream = streams
            .iter()
            .find(|stream| stream.kind == MediaKind::Video)
            .filter(|stream| stream.index < streams.len())
            .cloned()
            .ok_or(ShotError::NoVideoStream)?;
        log::debug!(
            "Selected video stream {} ({:?}, time base {})",
            stream.index,
            stream.codec,
            stream.time_base
        );

        let decoder = backend
            .open_decoder(source, &stream)
            .map_err(|error| ShotError::DecoderOpenError(error.to_string()))?;
        self.video_stream = Some(stream);
        let decoder_params = *self.decoder.insert(decoder).params();

        log::debug!("Opening encoder {}", self.encoder_name);
        let encoder = backend
            .open_encoder(&self.encoder_name, &decoder_params)
            .map_err(|error| ShotError::EncoderOpenError {
                encoder: self.encoder_name.clone(),
                reason: error.to_string(),
            })?;
        let encoder = self.encoder.insert(encoder);
        let encoder_params = *encoder.params();

        let spec = filter_spec.unwrap_or_else(|| default_filter_spec(decoder_params.kind()));
        log::debug!("Building filter graph \"{spec}\"");
        let filter = backend
            .open_filter(spec, &decoder_params, &encoder_params)
            .map_err(|error| ShotError::FilterGraphError(error.to_string()))?;
        self.filter = Some(filter);

        log::debug!("Opening output {}", self.output.display());
        let sink = backend
            .open_sink(&self.output, encoder)
            .map_err(|error| ShotError::MuxOpenError {
                locator: self.output.clone(),
                reason: error.to_string(),
            })?;
        self.sink = Some(sink);

        Ok(())
    }

    /// Release every collaborator and queued payload.
    ///
    /// Order: sink I/O, encoder, decoder, filter graph, sink, source, then
    /// the decoded-frame, filtered-frame and packet queues. Handles that were
    /// never opened are skipped. Calling `close` again does nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(sink) = self.sink.as_mut() {
            sink.close_io();
        }
        drop(self.encoder.take());
        drop(self.decoder.take());
        drop(self.filter.take());
        drop(self.sink.take());
        drop(self.source.take());

        let frames = self.frames.drain_with(drop);
        let filtered = self.filtered_frames.drain_with(drop);
        let packets = self.packets.drain_with(drop);
        if frames + filtered + packets > 0 {
            log::debug!(
                "Released {frames} decoded frames, {filtered} filtered frames and {packets} packets at close"
            );
        }

        self.options.clear();
    }

    /// Returns `true` once [`close`](PipelineContext::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Input locator.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Output path the sink was opened at.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Requested encoder name.
    pub fn encoder_name(&self) -> &str {
        &self.encoder_name
    }

    /// Options the source was opened with.
    pub fn source_options(&self) -> &SourceOptions {
        &self.options
    }

    /// The selected video stream.
    pub fn video_stream(&self) -> Option<&StreamInfo> {
        self.video_stream.as_ref()
    }

    /// Queue of key frames waiting for the filter stage.
    pub fn decoded_frames(&self) -> &BufferQueue<B::Frame> {
        &self.frames
    }

    /// Queue of filtered frames waiting for the encode stage.
    pub fn filtered_frames(&self) -> &BufferQueue<B::Frame> {
        &self.filtered_frames
    }

    /// Queue of coded units waiting for the mux stage.
    pub fn encoded_packets(&self) -> &BufferQueue<B::Unit> {
        &self.packets
    }

    /// Take the oldest decoded key frame, for the filter stage.
    pub fn take_decoded_frame(&mut self) -> Option<B::Frame> {
        self.frames.pop()
    }

    /// Take the oldest filtered frame, for the encode stage.
    pub fn take_filtered_frame(&mut self) -> Option<B::Frame> {
        self.filtered_frames.pop()
    }

    pub(crate) fn source_mut(&mut self) -> Result<&mut B::Source, ShotError> {
        self.source.as_mut().ok_or(ShotError::ContextClosed)
    }
}

impl<B: Backend> Drop for PipelineContext<B> {
    fn drop(&mut self) {
        self.close();
    }
}
