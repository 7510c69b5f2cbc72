//! Encoding sinks, segment joining and the final artifact.
//!
//! Sinks consume rendered frames in timeline order, one sink per segment (or one for an
//! unchunked render). `concat` folds segment files into the final stream.

/// Joining of per-segment artifacts.
pub mod concat;
/// `ffmpeg`-based MP4 sink (system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
/// Native YUV4MPEG2 sink.
pub mod y4m;

use std::path::Path;

use crate::config::OutputFormat;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};

use self::sink::{EncodeSettings, FrameSink};

/// Final encoded output of a render. Ownership passes to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// Container and codec.
    pub format: OutputFormat,
    /// Output resolution.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Number of encoded frames.
    pub frame_count: u64,
    /// Encoded stream.
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Container name (`mp4`, `yuv4mpeg2`).
    pub fn container(&self) -> &'static str {
        self.format.container()
    }

    /// Codec name.
    pub fn codec(&self) -> &'static str {
        self.format.codec()
    }

    /// Playback length implied by the frame count.
    pub fn duration_secs(&self) -> f64 {
        self.fps.frames_to_secs(self.frame_count)
    }
}

/// Fail early when the encoder backing `format` cannot run on this machine.
pub fn check_encoder_available(format: OutputFormat) -> ReelResult<()> {
    match format {
        OutputFormat::Y4m => Ok(()),
        OutputFormat::Mp4H264 if ffmpeg::is_ffmpeg_on_path() => Ok(()),
        OutputFormat::Mp4H264 => Err(ReelError::encode(
            "ffmpeg is required for MP4 encoding, but was not found on PATH",
        )),
    }
}

/// Open a sink for `settings.format` writing to `path`, with `begin` already called.
pub fn open_sink(settings: &EncodeSettings, path: &Path) -> ReelResult<Box<dyn FrameSink>> {
    let mut sink: Box<dyn FrameSink> = match settings.format {
        OutputFormat::Mp4H264 => Box::new(ffmpeg::FfmpegSink::new(path)),
        OutputFormat::Y4m => Box::new(y4m::Y4mSink::new(path)),
    };
    sink.begin(settings.clone())?;
    Ok(sink)
}
