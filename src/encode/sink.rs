use crate::config::OutputFormat;
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::frame::FrameRGBA;

/// Parameters shared by every frame of one artifact.
///
/// Intermediate artifacts of a chunked render all carry the same settings; joining relies on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct EncodeSettings {
    /// Output resolution.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Container and codec.
    pub format: OutputFormat,
}

impl EncodeSettings {
    /// Check the settings can be encoded by `format`.
    pub fn validate(&self) -> ReelResult<()> {
        self.canvas.validate()?;
        Fps::new(self.fps.num, self.fps.den)?;
        if self.format == OutputFormat::Mp4H264
            && (!self.canvas.width.is_multiple_of(2) || !self.canvas.height.is_multiple_of(2))
        {
            return Err(ReelError::invalid_parameter(
                "mp4 width/height must be even (required for yuv420p output)",
            ));
        }
        Ok(())
    }
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, settings: EncodeSettings) -> ReelResult<()>;
    /// Push one frame in strictly increasing timeline order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> ReelResult<()>;
}

/// In-memory sink for tests and previews.
#[derive(Debug, Default)]
pub struct InMemorySink {
    settings: Option<EncodeSettings>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings captured in `begin`, if any.
    pub fn settings(&self) -> Option<&EncodeSettings> {
        self.settings.as_ref()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    /// Take the captured frames, dropping their indices.
    pub fn into_frames(self) -> Vec<FrameRGBA> {
        self.frames.into_iter().map(|(_, f)| f).collect()
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, settings: EncodeSettings) -> ReelResult<()> {
        self.settings = Some(settings);
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        if let Some((last, _)) = self.frames.last()
            && idx.0 <= last.0
        {
            return Err(ReelError::encode("in-memory sink received out-of-order frame"));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        Ok(())
    }
}

/// Guard shared by file sinks: frames must match the configured canvas and arrive in order.
pub(crate) fn check_frame(
    settings: &EncodeSettings,
    last_idx: &mut Option<FrameIndex>,
    idx: FrameIndex,
    frame: &FrameRGBA,
) -> ReelResult<()> {
    if let Some(last) = *last_idx
        && idx.0 <= last.0
    {
        return Err(ReelError::encode("sink received out-of-order frame index"));
    }
    *last_idx = Some(idx);
    if frame.canvas() != settings.canvas {
        return Err(ReelError::encode(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width, frame.height, settings.canvas.width, settings.canvas.height
        )));
    }
    Ok(())
}
