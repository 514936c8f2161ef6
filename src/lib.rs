//! # keyshot
//!
//! Grab a single still image from a video: the first key frame of the first
//! video stream, re-encoded as a standalone image file.
//!
//! `keyshot` runs a one-pass pipeline (decode, filter, encode, mux) over the
//! FFmpeg libraries via the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)
//! crate, and stops as soon as one image has been written. It never decodes
//! more of the input than it needs.
//!
//! ## Quick Start
//!
//! ```no_run
//! use keyshot::Screenshot;
//!
//! let report = Screenshot::new("input.mp4").save("frame.jpg").unwrap();
//! println!("{} units read", report.units_read);
//! ```
//!
//! ### Other encoders, network inputs, filters
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use keyshot::Screenshot;
//!
//! Screenshot::new("rtsp://camera.local/stream")
//!     .encoder("png")
//!     .timeout(Duration::from_secs(5))
//!     .filter("scale=320:-1")
//!     .save("camera.png")
//!     .unwrap();
//! ```
//!
//! ### Status-code API
//!
//! ```no_run
//! let status = keyshot::shot("input.mp4", "mjpeg", "frame.jpg", 5000);
//! assert_eq!(status, 0);
//! ```
//!
//! ## Pipeline
//!
//! - [`PipelineContext`] owns the five collaborators (source, decoder,
//!   encoder, filter graph, sink) and the three [`BufferQueue`]s between
//!   the stages. It opens them in dependency order and releases whatever is
//!   open, in reverse order, on every exit path.
//! - The stages ([`decode_unit`], [`filter_frame`], [`encode_frame`],
//!   [`mux_queued_units`]) each feed one item to their collaborator and
//!   drain everything it produces into the next queue.
//! - Collaborators are reached through the traits in [`stage`]. The FFmpeg
//!   implementation is [`libav::FfmpegBackend`]; any other [`Backend`] can be
//!   driven with [`extract_with`].
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod config;
pub mod context;
pub mod decode;
pub mod encode;
pub mod error;
pub mod ffmpeg;
pub mod filter;
pub mod libav;
pub mod mux;
pub mod queue;
pub mod shot;
pub mod stage;
pub mod staging;

pub use config::{DEFAULT_IMAGE_ENCODER, ShotOptions, SourceOptions};
pub use context::PipelineContext;
pub use decode::decode_unit;
pub use encode::{derive_encoder_params, encode_frame};
pub use error::ShotError;
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use filter::{buffer_source_args, default_filter_spec, filter_frame};
pub use libav::FfmpegBackend;
pub use mux::{MuxPolicy, mux_queued_units};
pub use queue::BufferQueue;
pub use shot::{Screenshot, ShotReport, extract_with, shot};
pub use stage::{
    AudioFormat, Backend, CodecParams, CodedUnit, FrameFilter, MediaDecoder, MediaEncoder,
    MediaKind, MediaSink, MediaSource, Pull, StageFrame, StreamFormat, StreamInfo, VideoFormat,
};
pub use staging::{OutputStaging, StagedOutput};
