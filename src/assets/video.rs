use std::path::{Path, PathBuf};

use crate::assets::image::{ImageAsset, PixelFormat};
use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};

/// Basic metadata about a video source.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct VideoInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Playable duration in seconds.
    pub duration_secs: f64,
}

/// Frame-time-indexed video provider.
///
/// Implementations must be shareable across render workers; `frame_at` is called with source
/// times in `[0, info().duration_secs)`.
pub trait VideoSource: Send + Sync + std::fmt::Debug {
    /// Source metadata.
    fn info(&self) -> &VideoInfo;
    /// Decode the frame presented at `source_time_secs`.
    fn frame_at(&self, source_time_secs: f64) -> ReelResult<ImageAsset>;
}

/// In-memory frame sequence at a fixed frame rate.
///
/// Useful for hosts that decode video themselves, and for tests.
#[derive(Clone, Debug)]
pub struct FrameSequenceSource {
    info: VideoInfo,
    fps: Fps,
    frames: Vec<ImageAsset>,
}

impl FrameSequenceSource {
    /// Build a source from already decoded frames. All frames must share one size.
    pub fn new(fps: Fps, frames: Vec<ImageAsset>) -> ReelResult<Self> {
        let first = frames
            .first()
            .ok_or_else(|| ReelError::invalid_input("frame sequence must be non-empty"))?;
        let (width, height) = (first.width(), first.height());
        if frames
            .iter()
            .any(|f| f.width() != width || f.height() != height)
        {
            return Err(ReelError::invalid_input(
                "frame sequence frames must share one size",
            ));
        }
        Ok(Self {
            info: VideoInfo {
                width,
                height,
                duration_secs: fps.frames_to_secs(frames.len() as u64),
            },
            fps,
            frames,
        })
    }
}

impl VideoSource for FrameSequenceSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn frame_at(&self, source_time_secs: f64) -> ReelResult<ImageAsset> {
        if !source_time_secs.is_finite() || source_time_secs < 0.0 {
            return Err(ReelError::invalid_parameter(format!(
                "source time must be finite and >= 0, got {source_time_secs}"
            )));
        }
        let idx = (self.fps.secs_to_frames_floor(source_time_secs) as usize)
            .min(self.frames.len() - 1);
        Ok(self.frames[idx].clone())
    }
}

/// Video file decoded through the system `ffprobe`/`ffmpeg` binaries.
#[derive(Clone, Debug)]
pub struct FfmpegVideoSource {
    path: PathBuf,
    info: VideoInfo,
}

impl FfmpegVideoSource {
    /// Probe `path` and open it as a video source.
    pub fn open(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref().to_path_buf();
        let info = probe_video(&path)?;
        if info.width == 0 || info.height == 0 {
            return Err(ReelError::invalid_input(format!(
                "video '{}' has a zero-size video stream",
                path.display()
            )));
        }
        if !info.duration_secs.is_finite() || info.duration_secs <= 0.0 {
            return Err(ReelError::invalid_input(format!(
                "video '{}' has no playable duration",
                path.display()
            )));
        }
        Ok(Self { path, info })
    }
}

impl VideoSource for FfmpegVideoSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn frame_at(&self, source_time_secs: f64) -> ReelResult<ImageAsset> {
        let data = decode_video_frame_rgba8(&self.path, &self.info, source_time_secs)?;
        ImageAsset::new(self.info.width, self.info.height, PixelFormat::Rgba8, data)
    }
}

/// Probe video metadata through `ffprobe`.
#[cfg(feature = "media-ffmpeg")]
pub fn probe_video(source_path: &Path) -> ReelResult<VideoInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| ReelError::invalid_input(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::invalid_input(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ReelError::invalid_input(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ReelError::invalid_input("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| ReelError::invalid_input("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| ReelError::invalid_input("missing video height from ffprobe"))?;
    let duration_secs = video_stream
        .duration
        .as_deref()
        .or(parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.trim().parse::<f64>().ok())
        .ok_or_else(|| ReelError::invalid_input("missing video duration from ffprobe"))?;

    Ok(VideoInfo {
        width,
        height,
        duration_secs,
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
/// Probe video metadata through `ffprobe`.
///
/// Returns an error when the `media-ffmpeg` feature is disabled.
pub fn probe_video(_source_path: &Path) -> ReelResult<VideoInfo> {
    Err(ReelError::invalid_input(
        "video sources require the 'media-ffmpeg' feature",
    ))
}

#[cfg(feature = "media-ffmpeg")]
fn decode_video_frame_rgba8(
    source_path: &Path,
    info: &VideoInfo,
    source_time_secs: f64,
) -> ReelResult<Vec<u8>> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{source_time_secs:.9}")])
        .arg("-i")
        .arg(source_path)
        .args([
            "-frames:v",
            "1",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ])
        .output()
        .map_err(|e| {
            ReelError::invalid_input(format!("failed to run ffmpeg for video decode: {e}"))
        })?;

    if !out.status.success() {
        return Err(ReelError::invalid_input(format!(
            "ffmpeg video decode failed for '{}' at {source_time_secs:.3}s: {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let expected = (info.width as usize) * (info.height as usize) * 4;
    if out.stdout.len() < expected {
        return Err(ReelError::invalid_input(format!(
            "ffmpeg returned no video frame for '{}' at {source_time_secs:.3}s",
            source_path.display()
        )));
    }
    let mut data = out.stdout;
    data.truncate(expected);
    Ok(data)
}

#[cfg(not(feature = "media-ffmpeg"))]
fn decode_video_frame_rgba8(
    _source_path: &Path,
    _info: &VideoInfo,
    _source_time_secs: f64,
) -> ReelResult<Vec<u8>> {
    Err(ReelError::invalid_input(
        "video sources require the 'media-ffmpeg' feature",
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/video.rs"]
mod tests;
