//! Extraction configuration.
//!
//! [`ShotOptions`] is a builder carrying everything about an extraction
//! except its input and output: which encoder produces the image, how long
//! the source may block on connect, which filter graph sits between decoder
//! and encoder, how many encoded units the mux stage writes, and whether the
//! output is staged before being committed.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use keyshot::{MuxPolicy, OutputStaging, ShotOptions};
//!
//! let options = ShotOptions::new()
//!     .with_encoder("png")
//!     .with_timeout(Duration::from_secs(5))
//!     .with_filter("scale=320:-1")
//!     .with_mux_policy(MuxPolicy::FirstUnit)
//!     .with_staging(OutputStaging::Direct);
//! assert_eq!(options.encoder_name(), "png");
//! ```

use std::time::Duration;

use crate::mux::MuxPolicy;
use crate::staging::OutputStaging;

/// Encoder used when none is requested: motion JPEG, which writes a
/// standalone JPEG image per coded unit.
pub const DEFAULT_IMAGE_ENCODER: &str = "mjpeg";

/// Configuration for one extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotOptions {
    pub(crate) encoder_name: String,
    pub(crate) timeout: Option<Duration>,
    pub(crate) filter_spec: Option<String>,
    pub(crate) mux_policy: MuxPolicy,
    pub(crate) staging: OutputStaging,
}

impl Default for ShotOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ShotOptions {
    /// Create options with the defaults: `mjpeg` encoder, no read timeout,
    /// identity filter, first-unit mux policy, staged output.
    pub fn new() -> Self {
        Self {
            encoder_name: DEFAULT_IMAGE_ENCODER.to_string(),
            timeout: None,
            filter_spec: None,
            mux_policy: MuxPolicy::default(),
            staging: OutputStaging::default(),
        }
    }

    /// Set the encoder, by FFmpeg name (`mjpeg`, `png`, `bmp`, `libwebp`...).
    #[must_use]
    pub fn with_encoder(mut self, name: impl Into<String>) -> Self {
        self.encoder_name = name.into();
        self
    }

    /// Set the read timeout applied when connecting to the source.
    ///
    /// A zero duration disables the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Set the read timeout in milliseconds. Zero disables it.
    #[must_use]
    pub fn with_timeout_millis(self, millis: u64) -> Self {
        self.with_timeout(Duration::from_millis(millis))
    }

    /// Replace the identity filter with an FFmpeg filter graph description
    /// (for example `scale=640:-1`).
    #[must_use]
    pub fn with_filter(mut self, spec: impl Into<String>) -> Self {
        self.filter_spec = Some(spec.into());
        self
    }

    /// Choose how many queued units the mux stage writes.
    #[must_use]
    pub fn with_mux_policy(mut self, policy: MuxPolicy) -> Self {
        self.mux_policy = policy;
        self
    }

    /// Choose whether the output is staged and renamed on success.
    #[must_use]
    pub fn with_staging(mut self, staging: OutputStaging) -> Self {
        self.staging = staging;
        self
    }

    /// Requested encoder name.
    pub fn encoder_name(&self) -> &str {
        &self.encoder_name
    }

    /// Read timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Filter graph override, if any.
    pub fn filter_spec(&self) -> Option<&str> {
        self.filter_spec.as_deref()
    }

    /// Mux policy.
    pub fn mux_policy(&self) -> MuxPolicy {
        self.mux_policy
    }

    /// Output staging mode.
    pub fn staging(&self) -> OutputStaging {
        self.staging
    }
}

/// Options handed to the source reader when it opens the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOptions {
    timeout: Option<Duration>,
}

impl SourceOptions {
    /// Derive the source options for `locator`.
    ///
    /// RTMP does not accept a read timeout, so it is dropped for `rtmp://`
    /// style locators.
    pub fn for_input(locator: &str, timeout: Option<Duration>) -> Self {
        let scheme = locator
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase());
        let supports_timeout = !scheme.is_some_and(|scheme| scheme.starts_with("rtmp"));

        Self {
            timeout: timeout.filter(|timeout| supports_timeout && !timeout.is_zero()),
        }
    }

    /// Read timeout to apply, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Read timeout in microseconds, the unit FFmpeg's `timeout` option
    /// expects.
    pub fn timeout_micros(&self) -> Option<i64> {
        self.timeout
            .map(|timeout| i64::try_from(timeout.as_micros()).unwrap_or(i64::MAX))
    }

    /// Returns `true` when no option is set.
    pub fn is_empty(&self) -> bool {
        self.timeout.is_none()
    }

    pub(crate) fn clear(&mut self) {
        self.timeout = None;
    }
}
