use std::sync::Arc;

use crate::assets::image::ImageAsset;
use crate::assets::source::ClipSource;
use crate::assets::video::VideoSource;
use crate::composition::clip::ClipSpec;
use crate::composition::timeline::Timeline;
use crate::config::RenderConfig;
use crate::foundation::error::{ReelError, ReelResult};

/// What a render request is made from.
#[derive(Clone, Debug)]
pub enum RenderInput {
    /// Ordered still images, one clip each.
    Images(Vec<ImageAsset>),
    /// One long video, cut into consecutive clips.
    Video(Arc<dyn VideoSource>),
}

impl RenderInput {
    /// Number of clips this input will produce under `config`.
    pub fn clip_count(&self, config: &RenderConfig) -> usize {
        match self {
            Self::Images(images) => images.len(),
            Self::Video(source) => video_clip_starts(source.info().duration_secs, config).len(),
        }
    }
}

/// One clip per image, in submission order, all sharing the config's clip parameters.
pub fn clips_from_images(images: Vec<ImageAsset>, config: &RenderConfig) -> Vec<ClipSpec> {
    images
        .into_iter()
        .map(|img| clip_with_params(ClipSource::image(img), config.clip_duration, config))
        .collect()
}

/// Cut `source` into consecutive clips of `clip_duration`.
///
/// A tail too short to carry the transition on both sides is folded into the previous clip.
pub fn split_video(
    source: Arc<dyn VideoSource>,
    config: &RenderConfig,
) -> ReelResult<Vec<ClipSpec>> {
    let total = source.info().duration_secs;
    if !total.is_finite() || total <= 0.0 {
        return Err(ReelError::invalid_input(format!(
            "video source has no playable duration ({total}s)"
        )));
    }

    let starts = video_clip_starts(total, config);
    let mut clips = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(total);
        let src = ClipSource::video_segment(Arc::clone(&source), start);
        clips.push(clip_with_params(src, end - start, config));
    }
    Ok(clips)
}

/// Build the timeline for `input` under `config`.
pub fn build_timeline(input: RenderInput, config: &RenderConfig) -> ReelResult<Timeline> {
    let clips = match input {
        RenderInput::Images(images) => clips_from_images(images, config),
        RenderInput::Video(source) => split_video(source, config)?,
    };
    Timeline::new(clips, config.transition_duration)
}

fn clip_with_params(source: ClipSource, duration: f64, config: &RenderConfig) -> ClipSpec {
    ClipSpec::new(source, duration)
        .with_zoom(config.zoom_factor)
        .with_fades(config.fade_in, config.fade_out)
}

fn video_clip_starts(total: f64, config: &RenderConfig) -> Vec<f64> {
    let step = config.clip_duration;
    if !step.is_finite() || step <= 0.0 || !total.is_finite() || total <= 0.0 {
        return Vec::new();
    }
    // A tail must leave room for the crossfade on its leading side and any fades.
    let min_tail = (2.0 * config.transition_duration).max(config.fade_in + config.fade_out);

    let mut starts = vec![0.0];
    let mut next = step;
    while next < total {
        if total - next <= min_tail {
            break;
        }
        starts.push(next);
        next += step;
    }
    starts
}

#[cfg(test)]
#[path = "../../tests/unit/composition/assemble.rs"]
mod tests;
