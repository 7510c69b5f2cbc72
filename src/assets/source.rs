use std::sync::Arc;

use crate::assets::image::{ImageAsset, normalize_to_canvas};
use crate::assets::video::VideoSource;
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::frame::FrameRGBA;

/// One image or one video segment, exposed as a frame provider in clip-local time.
#[derive(Clone, Debug)]
pub enum ClipSource {
    /// A still image shown for the whole clip.
    Image(ImageAsset),
    /// A window of a longer video, starting at `start_secs` of source time.
    Video {
        /// Shared video provider.
        source: Arc<dyn VideoSource>,
        /// Source time shown at clip-local time zero.
        start_secs: f64,
    },
}

impl ClipSource {
    /// A still image source.
    pub fn image(asset: ImageAsset) -> Self {
        Self::Image(asset)
    }

    /// A video window beginning at `start_secs`.
    pub fn video_segment(source: Arc<dyn VideoSource>, start_secs: f64) -> Self {
        Self::Video { source, start_secs }
    }

    /// `true` when every local time yields the same source pixels.
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Image(_))
    }

    /// Native source dimensions.
    pub fn native_size(&self) -> (u32, u32) {
        match self {
            Self::Image(img) => (img.width(), img.height()),
            Self::Video { source, .. } => (source.info().width, source.info().height),
        }
    }

    /// Decoded bytes this source keeps alive for as long as it exists.
    pub fn held_bytes(&self) -> u64 {
        match self {
            Self::Image(img) => img.data().len() as u64,
            Self::Video { .. } => 0,
        }
    }

    /// Bytes of one frame decoded on demand by [`ClipSource::frame_at`] before normalization.
    pub fn decoded_frame_bytes(&self) -> u64 {
        match self {
            Self::Image(_) => 0,
            Self::Video { source, .. } => {
                u64::from(source.info().width) * u64::from(source.info().height) * 4
            }
        }
    }

    /// Check the source can be rendered at all.
    pub(crate) fn validate(&self) -> ReelResult<()> {
        let (w, h) = self.native_size();
        if w == 0 || h == 0 {
            return Err(ReelError::invalid_input(format!(
                "clip source is zero-size ({w}x{h})"
            )));
        }
        if let Self::Video { source, start_secs } = self
            && (!start_secs.is_finite()
                || *start_secs < 0.0
                || *start_secs >= source.info().duration_secs)
        {
            return Err(ReelError::invalid_input(format!(
                "video segment start {start_secs}s is outside the source duration {}s",
                source.info().duration_secs
            )));
        }
        Ok(())
    }

    /// Decode and normalize the frame shown at clip-local time `local_secs`.
    pub fn frame_at(&self, local_secs: f64, canvas: Canvas) -> ReelResult<FrameRGBA> {
        match self {
            Self::Image(img) => normalize_to_canvas(img, canvas),
            Self::Video { source, start_secs } => {
                let frame = source.frame_at(start_secs + local_secs.max(0.0))?;
                normalize_to_canvas(&frame, canvas)
            }
        }
    }
}
