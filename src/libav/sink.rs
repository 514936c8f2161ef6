use std::ffi::CString;
use std::path::Path;
use std::ptr;

use ffmpeg_next::format::Flags as FormatFlags;
use ffmpeg_next::format::context::Output;
use ffmpeg_next::{Error as FfmpegError, Packet};

use super::encoder::FfmpegEncoder;
use crate::stage::{MediaEncoder, MediaSink};

/// Output container holding a single stream.
pub struct FfmpegSink {
    output: Output,
    owns_io: bool,
}

impl FfmpegSink {
    /// Allocate the container guessed from the locator's extension, add one
    /// stream copied from `encoder`, open the I/O and write the header.
    pub(super) fn open(locator: &Path, encoder: &mut FfmpegEncoder) -> Result<Self, FfmpegError> {
        let path = CString::new(locator.to_string_lossy().as_bytes())
            .map_err(|_| FfmpegError::InvalidData)?;

        let mut output = unsafe {
            let mut raw = ptr::null_mut();
            let result = ffmpeg_sys_next::avformat_alloc_output_context2(
                &mut raw,
                ptr::null_mut(),
                ptr::null(),
                path.as_ptr(),
            );
            if result < 0 || raw.is_null() {
                return Err(FfmpegError::from(result.min(-1)));
            }
            Output::wrap(raw)
        };

        let flags = output.format().flags();
        if flags.contains(FormatFlags::GLOBAL_HEADER) {
            encoder.request_global_header();
        }

        {
            let mut stream = output.add_stream(encoder.codec())?;
            encoder.copy_parameters_to(&mut stream);
        }

        let owns_io = !flags.contains(FormatFlags::NO_FILE);
        if owns_io {
            let result = unsafe {
                ffmpeg_sys_next::avio_open(
                    &mut (*output.as_mut_ptr()).pb,
                    path.as_ptr(),
                    ffmpeg_sys_next::AVIO_FLAG_WRITE as i32,
                )
            };
            if result < 0 {
                return Err(FfmpegError::from(result));
            }
        }

        output.write_header()?;
        log::debug!(
            "Wrote {} header to {}",
            output.format().name(),
            locator.display()
        );

        Ok(Self { output, owns_io })
    }
}

impl MediaSink for FfmpegSink {
    type Unit = Packet;

    fn write_interleaved(&mut self, mut unit: Packet) -> Result<(), FfmpegError> {
        unit.write_interleaved(&mut self.output)
    }

    fn write_trailer(&mut self) -> Result<(), FfmpegError> {
        self.output.write_trailer()
    }

    fn close_io(&mut self) {
        if !self.owns_io {
            return;
        }
        self.owns_io = false;
        unsafe {
            ffmpeg_sys_next::avio_closep(&mut (*self.output.as_mut_ptr()).pb);
        }
    }
}
