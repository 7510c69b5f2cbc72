//! The immutable configuration record passed into every render entry point.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};

/// Container/codec pair of the output artifact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// H.264 (libx264, yuv420p) in MP4, encoded by the system `ffmpeg`.
    #[default]
    Mp4H264,
    /// Uncompressed 4:4:4 YUV in a YUV4MPEG2 stream, written natively.
    Y4m,
}

impl OutputFormat {
    /// Container name.
    pub fn container(self) -> &'static str {
        match self {
            Self::Mp4H264 => "mp4",
            Self::Y4m => "yuv4mpeg2",
        }
    }

    /// Codec name.
    pub fn codec(self) -> &'static str {
        match self {
            Self::Mp4H264 => "h264",
            Self::Y4m => "rawvideo-yuv444p",
        }
    }

    /// File extension used for artifacts of this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4H264 => "mp4",
            Self::Y4m => "y4m",
        }
    }
}

/// Admission-control maxima, checked before any rendering work begins.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderLimits {
    /// Maximum number of clips/assets in one request.
    pub max_assets: usize,
    /// Maximum timeline length in seconds.
    pub max_total_duration_secs: f64,
    /// Maximum estimated decoded bytes held at once: decoded sources plus every worker's buffers.
    pub max_buffered_bytes: u64,
    /// Optional wall-clock budget for the whole render, in seconds.
    pub max_render_secs: Option<f64>,
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self {
            max_assets: 1000,
            max_total_duration_secs: 4.0 * 3600.0,
            max_buffered_bytes: 2 * 1024 * 1024 * 1024,
            max_render_secs: None,
        }
    }
}

impl RenderLimits {
    /// Reject requests exceeding the asset count or duration maxima.
    pub fn admit(&self, asset_count: usize, total_duration_secs: f64) -> ReelResult<()> {
        if asset_count > self.max_assets {
            return Err(ReelError::resource_exhausted(format!(
                "{asset_count} assets exceed the limit of {}",
                self.max_assets
            )));
        }
        if total_duration_secs > self.max_total_duration_secs {
            return Err(ReelError::resource_exhausted(format!(
                "total duration {total_duration_secs:.3}s exceeds the limit of {:.3}s",
                self.max_total_duration_secs
            )));
        }
        Ok(())
    }

    fn validate(&self) -> ReelResult<()> {
        if self.max_assets == 0 {
            return Err(ReelError::invalid_parameter("limits.max_assets must be >= 1"));
        }
        if !self.max_total_duration_secs.is_finite() || self.max_total_duration_secs <= 0.0 {
            return Err(ReelError::invalid_parameter(
                "limits.max_total_duration_secs must be finite and > 0",
            ));
        }
        if self.max_buffered_bytes == 0 {
            return Err(ReelError::invalid_parameter(
                "limits.max_buffered_bytes must be > 0",
            ));
        }
        if let Some(secs) = self.max_render_secs
            && (!secs.is_finite() || secs <= 0.0)
        {
            return Err(ReelError::invalid_parameter(
                "limits.max_render_secs must be finite and > 0 when set",
            ));
        }
        Ok(())
    }
}

/// Threading controls for chunked rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderThreading {
    /// Render independent segments on a worker pool when `true`.
    pub parallel: bool,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
}

impl RenderThreading {
    /// Number of segments that may be in flight at once.
    pub fn workers(&self) -> usize {
        if !self.parallel {
            return 1;
        }
        self.threads
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
            .max(1)
    }
}

/// Every parameter of a render request.
///
/// Loaded from JSON with [`RenderConfig::from_json_file`]; missing fields take the defaults below.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Length of each clip, seconds.
    pub clip_duration: f64,
    /// Zoom reached at the end of each clip.
    pub zoom_factor: f64,
    /// Crossfade overlap between adjacent clips, seconds.
    pub transition_duration: f64,
    /// Per-clip fade from black, seconds.
    pub fade_in: f64,
    /// Per-clip fade to black, seconds.
    pub fade_out: f64,
    /// Integer output frame rate.
    pub fps: u32,
    /// Output resolution.
    pub canvas: Canvas,
    /// Output container and codec.
    pub format: OutputFormat,
    /// Segment length for the chunked path; `None` renders in one pass.
    pub chunk_duration: Option<f64>,
    /// Directory under which per-render scratch directories are created.
    pub scratch_dir: Option<PathBuf>,
    /// Admission control.
    pub limits: RenderLimits,
    /// Segment worker pool.
    pub threading: RenderThreading,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clip_duration: 2.0,
            zoom_factor: 1.2,
            transition_duration: 0.5,
            fade_in: 0.0,
            fade_out: 0.0,
            fps: 24,
            canvas: Canvas {
                width: 1280,
                height: 720,
            },
            format: OutputFormat::Mp4H264,
            chunk_duration: None,
            scratch_dir: None,
            limits: RenderLimits::default(),
            threading: RenderThreading::default(),
        }
    }
}

impl RenderConfig {
    /// Parse a JSON configuration document.
    pub fn from_json_str(s: &str) -> ReelResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| ReelError::invalid_parameter(format!("parse render config: {e}")))
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: &Path) -> ReelResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read render config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Validated output frame rate.
    pub fn fps(&self) -> ReelResult<Fps> {
        Fps::integer(self.fps)
    }

    /// Scratch root for intermediate artifacts.
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Check every parameter. Nothing is rendered or written for a config that fails here.
    pub fn validate(&self) -> ReelResult<()> {
        if !self.clip_duration.is_finite() || self.clip_duration <= 0.0 {
            return Err(ReelError::invalid_parameter(format!(
                "clip_duration must be finite and > 0, got {}",
                self.clip_duration
            )));
        }
        if !self.zoom_factor.is_finite() || self.zoom_factor < 1.0 {
            return Err(ReelError::invalid_parameter(format!(
                "zoom_factor must be finite and >= 1.0, got {}",
                self.zoom_factor
            )));
        }
        if !self.transition_duration.is_finite() || self.transition_duration < 0.0 {
            return Err(ReelError::invalid_parameter(format!(
                "transition_duration must be finite and >= 0, got {}",
                self.transition_duration
            )));
        }
        if self.transition_duration >= self.clip_duration / 2.0 {
            return Err(ReelError::invalid_parameter(format!(
                "transition_duration {}s must be shorter than half of clip_duration {}s",
                self.transition_duration, self.clip_duration
            )));
        }
        for (name, v) in [("fade_in", self.fade_in), ("fade_out", self.fade_out)] {
            if !v.is_finite() || v < 0.0 {
                return Err(ReelError::invalid_parameter(format!(
                    "{name} must be finite and >= 0, got {v}"
                )));
            }
        }
        if self.fade_in + self.fade_out > self.clip_duration {
            return Err(ReelError::invalid_parameter(
                "fade_in + fade_out must not exceed clip_duration",
            ));
        }
        self.validate_output()
    }

    /// Check the output, chunking, threading and limit fields only.
    ///
    /// Enough for rendering a prebuilt [`crate::Timeline`], whose clips carry their own
    /// durations, zoom, fades and transition length.
    pub fn validate_output(&self) -> ReelResult<()> {
        self.fps()?;
        self.canvas.validate()?;
        if self.format == OutputFormat::Mp4H264
            && (!self.canvas.width.is_multiple_of(2) || !self.canvas.height.is_multiple_of(2))
        {
            return Err(ReelError::invalid_parameter(format!(
                "mp4 output needs an even canvas (yuv420p), got {}x{}",
                self.canvas.width, self.canvas.height
            )));
        }
        if let Some(chunk) = self.chunk_duration
            && (!chunk.is_finite() || chunk <= 0.0)
        {
            return Err(ReelError::invalid_parameter(format!(
                "chunk_duration must be finite and > 0 when set, got {chunk}"
            )));
        }
        if self.threading.threads == Some(0) {
            return Err(ReelError::invalid_parameter(
                "threading.threads must be >= 1 when set",
            ));
        }
        self.limits.validate()
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
