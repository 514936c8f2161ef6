//! In-memory backend shared by the pipeline integration tests.
//!
//! Every collaborator records what happens to it in a shared [`Journal`], so
//! tests can check reads, writes and teardown order without FFmpeg doing any
//! decoding. The sink writes a small text container (`HEADER`, one `UNIT:`
//! line per unit, `TRAILER`) to the path it is opened at.

#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::VecDeque,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    rc::Rc,
};

use ffmpeg_next::{Error as FfmpegError, Rational, codec::Id, format::Pixel};
use keyshot::{
    Backend, CodecParams, CodedUnit, FrameFilter, MediaDecoder, MediaEncoder, MediaKind,
    MediaSink, MediaSource, Pull, SourceOptions, StageFrame, StreamFormat, StreamInfo,
    VideoFormat, derive_encoder_params,
};

/// Time base of the mock video stream.
pub fn stream_time_base() -> Rational {
    Rational::new(1, 90000)
}

/// Frame rate the mock decoder reports.
pub fn frame_rate() -> Rational {
    Rational::new(25, 1)
}

/// Where a mock collaborator should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    OpenSource,
    OpenDecoder,
    OpenEncoder,
    OpenFilter,
    OpenSink,
    Read,
    DecodeSubmit,
    DecodeReceive,
    FilterSubmit,
    FilterReceive,
    EncodeSubmit,
    EncodeReceive,
    WriteUnit,
    WriteTrailer,
}

/// Everything the mock collaborators observed.
#[derive(Debug, Default)]
pub struct Journal {
    /// Lifecycle events, in order (`open:decoder`, `close_io:sink`,
    /// `drop:encoder`...).
    pub events: Vec<String>,
    pub units_read: usize,
    pub units_decoded: Vec<MockUnit>,
    pub frames_encoded: Vec<MockFrame>,
    pub written: Vec<MockUnit>,
    pub trailer_written: bool,
    pub source_options: Option<SourceOptions>,
    pub filter_spec: Option<String>,
    pub global_header_requested: bool,
}

pub type SharedJournal = Rc<RefCell<Journal>>;

fn record(journal: &SharedJournal, event: &str) {
    journal.borrow_mut().events.push(event.to_string());
}

fn injected() -> FfmpegError {
    FfmpegError::InvalidData
}

fn rescale(value: i64, from: Rational, to: Rational) -> i64 {
    let numerator = i128::from(value) * i128::from(from.numerator()) * i128::from(to.denominator());
    let denominator = i128::from(from.denominator()) * i128::from(to.numerator());
    (numerator / denominator) as i64
}

/// A coded unit: stream index, timestamp and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockUnit {
    pub stream: usize,
    pub pts: Option<i64>,
    /// Whether the decoder turns this unit into a key frame.
    pub key: bool,
    /// Whether the decoder produces a frame at all for this unit.
    pub decodable: bool,
    pub payload: Vec<u8>,
}

impl MockUnit {
    pub fn key(stream: usize, pts: i64, payload: &str) -> Self {
        Self {
            stream,
            pts: Some(pts),
            key: true,
            decodable: true,
            payload: payload.as_bytes().to_vec(),
        }
    }

    pub fn delta(stream: usize, pts: i64, payload: &str) -> Self {
        Self {
            key: false,
            ..Self::key(stream, pts, payload)
        }
    }

    /// A unit the decoder swallows without producing a frame.
    pub fn opaque(stream: usize, pts: i64, payload: &str) -> Self {
        Self {
            decodable: false,
            ..Self::key(stream, pts, payload)
        }
    }
}

impl CodedUnit for MockUnit {
    fn stream_index(&self) -> usize {
        self.stream
    }

    fn set_stream_index(&mut self, index: usize) {
        self.stream = index;
    }

    fn rescale_ts(&mut self, from: Rational, to: Rational) {
        self.pts = self.pts.map(|pts| rescale(pts, from, to));
    }
}

/// A decoded or filtered frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFrame {
    pub pts: Option<i64>,
    pub best_effort: Option<i64>,
    pub key: bool,
    pub picture_type_cleared: bool,
    pub payload: Vec<u8>,
}

impl StageFrame for MockFrame {
    fn is_key(&self) -> bool {
        self.key
    }

    fn best_effort_timestamp(&self) -> Option<i64> {
        self.best_effort
    }

    fn set_pts(&mut self, pts: Option<i64>) {
        self.pts = pts;
    }

    fn clear_picture_type(&mut self) {
        self.picture_type_cleared = true;
    }
}

pub struct MockSource {
    streams: Vec<StreamInfo>,
    units: VecDeque<MockUnit>,
    fail_read: bool,
    journal: SharedJournal,
}

impl MediaSource for MockSource {
    type Unit = MockUnit;

    fn streams(&self) -> Vec<StreamInfo> {
        self.streams.clone()
    }

    fn read_unit(&mut self) -> Result<Option<MockUnit>, FfmpegError> {
        if self.fail_read {
            return Err(injected());
        }
        let unit = self.units.pop_front();
        if unit.is_some() {
            self.journal.borrow_mut().units_read += 1;
        }
        Ok(unit)
    }
}

impl Drop for MockSource {
    fn drop(&mut self) {
        record(&self.journal, "drop:source");
    }
}

pub struct MockDecoder {
    params: CodecParams,
    pending: VecDeque<MockFrame>,
    fail: Option<FailAt>,
    journal: SharedJournal,
}

impl MediaDecoder for MockDecoder {
    type Unit = MockUnit;
    type Frame = MockFrame;

    fn params(&self) -> &CodecParams {
        &self.params
    }

    fn submit(&mut self, unit: &MockUnit) -> Result<(), FfmpegError> {
        if self.fail == Some(FailAt::DecodeSubmit) {
            return Err(injected());
        }
        self.journal.borrow_mut().units_decoded.push(unit.clone());
        if unit.decodable {
            self.pending.push_back(MockFrame {
                pts: None,
                best_effort: unit.pts,
                key: unit.key,
                picture_type_cleared: false,
                payload: unit.payload.clone(),
            });
        }
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<Pull<MockFrame>, FfmpegError> {
        if self.fail == Some(FailAt::DecodeReceive) {
            return Err(injected());
        }
        Ok(self
            .pending
            .pop_front()
            .map_or(Pull::NeedMoreInput, Pull::Ready))
    }
}

impl Drop for MockDecoder {
    fn drop(&mut self) {
        record(&self.journal, "drop:decoder");
    }
}

pub struct MockFilter {
    pending: VecDeque<MockFrame>,
    fail: Option<FailAt>,
    journal: SharedJournal,
}

impl FrameFilter for MockFilter {
    type Frame = MockFrame;

    fn submit(&mut self, frame: &MockFrame) -> Result<(), FfmpegError> {
        if self.fail == Some(FailAt::FilterSubmit) {
            return Err(injected());
        }
        self.pending.push_back(frame.clone());
        Ok(())
    }

    fn receive(&mut self) -> Result<Pull<MockFrame>, FfmpegError> {
        if self.fail == Some(FailAt::FilterReceive) {
            return Err(injected());
        }
        Ok(self
            .pending
            .pop_front()
            .map_or(Pull::NeedMoreInput, Pull::Ready))
    }
}

impl Drop for MockFilter {
    fn drop(&mut self) {
        record(&self.journal, "drop:filter");
    }
}

pub struct MockEncoder {
    params: CodecParams,
    pending: VecDeque<MockUnit>,
    units_per_frame: usize,
    fail: Option<FailAt>,
    journal: SharedJournal,
}

impl MediaEncoder for MockEncoder {
    type Frame = MockFrame;
    type Unit = MockUnit;

    fn params(&self) -> &CodecParams {
        &self.params
    }

    fn submit(&mut self, frame: &MockFrame) -> Result<(), FfmpegError> {
        if self.fail == Some(FailAt::EncodeSubmit) {
            return Err(injected());
        }
        self.journal.borrow_mut().frames_encoded.push(frame.clone());
        for part in 0..self.units_per_frame {
            let mut payload = frame.payload.clone();
            if part > 0 {
                payload.extend_from_slice(format!("#{part}").as_bytes());
            }
            self.pending.push_back(MockUnit {
                stream: 0,
                pts: frame.pts,
                key: true,
                decodable: true,
                payload,
            });
        }
        Ok(())
    }

    fn receive_unit(&mut self) -> Result<Pull<MockUnit>, FfmpegError> {
        if self.fail == Some(FailAt::EncodeReceive) {
            return Err(injected());
        }
        Ok(self
            .pending
            .pop_front()
            .map_or(Pull::NeedMoreInput, Pull::Ready))
    }

    fn request_global_header(&mut self) {
        self.journal.borrow_mut().global_header_requested = true;
    }
}

impl Drop for MockEncoder {
    fn drop(&mut self) {
        record(&self.journal, "drop:encoder");
    }
}

pub struct MockSink {
    path: PathBuf,
    fail: Option<FailAt>,
    journal: SharedJournal,
}

impl MockSink {
    fn append(&self, bytes: &[u8]) -> Result<(), FfmpegError> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|_| injected())?;
        file.write_all(bytes).map_err(|_| injected())
    }
}

impl MediaSink for MockSink {
    type Unit = MockUnit;

    fn write_interleaved(&mut self, unit: MockUnit) -> Result<(), FfmpegError> {
        if self.fail == Some(FailAt::WriteUnit) {
            return Err(injected());
        }
        let mut line = b"UNIT:".to_vec();
        line.extend_from_slice(&unit.payload);
        line.push(b'\n');
        self.append(&line)?;
        self.journal.borrow_mut().written.push(unit);
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<(), FfmpegError> {
        if self.fail == Some(FailAt::WriteTrailer) {
            return Err(injected());
        }
        self.append(b"TRAILER\n")?;
        self.journal.borrow_mut().trailer_written = true;
        Ok(())
    }

    fn close_io(&mut self) {
        record(&self.journal, "close_io:sink");
    }
}

impl Drop for MockSink {
    fn drop(&mut self) {
        record(&self.journal, "drop:sink");
    }
}

/// Factory for the mock collaborators.
pub struct MockBackend {
    streams: Vec<StreamInfo>,
    units: Vec<MockUnit>,
    fail: Option<FailAt>,
    units_per_frame: usize,
    decoder_time_base: Option<Rational>,
    global_header: bool,
    journal: SharedJournal,
}

impl MockBackend {
    /// A backend whose input has one video stream (index 0) carrying `units`.
    pub fn new(units: Vec<MockUnit>) -> Self {
        Self {
            streams: vec![video_stream(0)],
            units,
            fail: None,
            units_per_frame: 1,
            decoder_time_base: None,
            global_header: false,
            journal: SharedJournal::default(),
        }
    }

    pub fn with_streams(mut self, streams: Vec<StreamInfo>) -> Self {
        self.streams = streams;
        self
    }

    pub fn failing_at(mut self, fail: FailAt) -> Self {
        self.fail = Some(fail);
        self
    }

    /// Make the encoder emit `count` units for every frame.
    pub fn with_units_per_frame(mut self, count: usize) -> Self {
        self.units_per_frame = count;
        self
    }

    /// Give the decoder a time base different from the stream's.
    pub fn with_decoder_time_base(mut self, time_base: Rational) -> Self {
        self.decoder_time_base = Some(time_base);
        self
    }

    /// Pretend the output container stores codec headers globally.
    pub fn with_global_header(mut self) -> Self {
        self.global_header = true;
        self
    }

    pub fn journal(&self) -> SharedJournal {
        Rc::clone(&self.journal)
    }

    fn fails(&self, point: FailAt) -> Result<(), FfmpegError> {
        if self.fail == Some(point) {
            Err(injected())
        } else {
            Ok(())
        }
    }
}

impl Backend for MockBackend {
    type Unit = MockUnit;
    type Frame = MockFrame;
    type Source = MockSource;
    type Decoder = MockDecoder;
    type Encoder = MockEncoder;
    type Filter = MockFilter;
    type Sink = MockSink;

    fn open_source(
        &mut self,
        _locator: &str,
        options: &SourceOptions,
    ) -> Result<MockSource, FfmpegError> {
        self.fails(FailAt::OpenSource)?;
        record(&self.journal, "open:source");
        self.journal.borrow_mut().source_options = Some(options.clone());
        Ok(MockSource {
            streams: self.streams.clone(),
            units: self.units.iter().cloned().collect(),
            fail_read: self.fail == Some(FailAt::Read),
            journal: self.journal(),
        })
    }

    fn open_decoder(
        &mut self,
        _source: &MockSource,
        stream: &StreamInfo,
    ) -> Result<MockDecoder, FfmpegError> {
        self.fails(FailAt::OpenDecoder)?;
        record(&self.journal, "open:decoder");
        Ok(MockDecoder {
            params: CodecParams {
                format: StreamFormat::Video(VideoFormat {
                    width: 320,
                    height: 240,
                    pixel_format: Pixel::YUV420P,
                    aspect_ratio: Rational::new(1, 1),
                }),
                time_base: self.decoder_time_base.unwrap_or(stream.time_base),
                frame_rate: Some(frame_rate()),
            },
            pending: VecDeque::new(),
            fail: self.fail,
            journal: self.journal(),
        })
    }

    fn open_encoder(
        &mut self,
        _name: &str,
        decoder: &CodecParams,
    ) -> Result<MockEncoder, FfmpegError> {
        self.fails(FailAt::OpenEncoder)?;
        record(&self.journal, "open:encoder");
        Ok(MockEncoder {
            params: derive_encoder_params(decoder, Some(&[Pixel::YUVJ420P]), None),
            pending: VecDeque::new(),
            units_per_frame: self.units_per_frame,
            fail: self.fail,
            journal: self.journal(),
        })
    }

    fn open_filter(
        &mut self,
        spec: &str,
        _decoder: &CodecParams,
        _encoder: &CodecParams,
    ) -> Result<MockFilter, FfmpegError> {
        self.fails(FailAt::OpenFilter)?;
        record(&self.journal, "open:filter");
        self.journal.borrow_mut().filter_spec = Some(spec.to_string());
        Ok(MockFilter {
            pending: VecDeque::new(),
            fail: self.fail,
            journal: self.journal(),
        })
    }

    fn open_sink(
        &mut self,
        locator: &Path,
        encoder: &mut MockEncoder,
    ) -> Result<MockSink, FfmpegError> {
        self.fails(FailAt::OpenSink)?;
        if self.global_header {
            encoder.request_global_header();
        }
        fs::write(locator, b"HEADER\n").map_err(|_| injected())?;
        record(&self.journal, "open:sink");
        Ok(MockSink {
            path: locator.to_path_buf(),
            fail: self.fail,
            journal: self.journal(),
        })
    }
}

pub fn video_stream(index: usize) -> StreamInfo {
    StreamInfo {
        index,
        kind: MediaKind::Video,
        codec: Id::H264,
        time_base: stream_time_base(),
    }
}

pub fn audio_stream(index: usize) -> StreamInfo {
    StreamInfo {
        index,
        kind: MediaKind::Audio,
        codec: Id::AAC,
        time_base: Rational::new(1, 48000),
    }
}

/// Five video units, only the first of which is a key frame.
pub fn five_units_first_key() -> Vec<MockUnit> {
    vec![
        MockUnit::key(0, 0, "unit0"),
        MockUnit::delta(0, 3600, "unit1"),
        MockUnit::delta(0, 7200, "unit2"),
        MockUnit::delta(0, 10800, "unit3"),
        MockUnit::delta(0, 14400, "unit4"),
    ]
}

/// Lifecycle events recorded so far.
pub fn events(journal: &SharedJournal) -> Vec<String> {
    journal.borrow().events.clone()
}

/// Teardown events only (`close_io:*` and `drop:*`).
pub fn teardown_events(journal: &SharedJournal) -> Vec<String> {
    events(journal)
        .into_iter()
        .filter(|event| event.starts_with("drop:") || event.starts_with("close_io:"))
        .collect()
}
