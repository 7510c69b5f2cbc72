use std::collections::BTreeSet;

use crate::assets::source::ClipSource;
use crate::composition::clip::ClipSpec;
use crate::foundation::core::{Fps, TimeRange};
use crate::foundation::error::{ReelError, ReelResult};

/// A clip index paired with a time in that clip's own local timeline.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ClipTime {
    /// Index into [`Timeline::clips`].
    pub clip: usize,
    /// Local time in seconds, `0 <= local_secs < duration`.
    pub local_secs: f64,
}

/// What is on screen at one instant of the timeline.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub enum Located {
    /// Exactly one clip is visible.
    Single(ClipTime),
    /// Two adjacent clips are crossfading.
    Transition {
        /// Clip `i`, leaving.
        outgoing: ClipTime,
        /// Clip `i + 1`, arriving.
        incoming: ClipTime,
        /// Weight of the incoming clip, 0 at window start and 1 at window end.
        alpha: f64,
    },
}

/// Ordered clips with a uniform crossfade overlap between each adjacent pair.
///
/// Clip `i` occupies `[start_i, start_i + duration_i)` with
/// `start_{i+1} = start_i + duration_i - transition_duration`, so adjacent clips overlap by
/// exactly one transition window and the total is `Σ duration - (N - 1) * transition_duration`.
#[derive(Clone, Debug)]
pub struct Timeline {
    clips: Vec<ClipSpec>,
    transition_duration: f64,
    starts: Vec<f64>,
    total: f64,
}

impl Timeline {
    /// Validate `clips` and the transition length, and lay them out in submission order.
    pub fn new(clips: Vec<ClipSpec>, transition_duration: f64) -> ReelResult<Self> {
        if clips.is_empty() {
            return Err(ReelError::invalid_input("timeline needs at least one clip"));
        }
        if !transition_duration.is_finite() || transition_duration < 0.0 {
            return Err(ReelError::invalid_parameter(format!(
                "transition_duration must be finite and >= 0, got {transition_duration}"
            )));
        }
        for (i, clip) in clips.iter().enumerate() {
            clip.validate().map_err(|e| prefix_clip_error(i, e))?;
        }
        for (i, pair) in clips.windows(2).enumerate() {
            let shorter = pair[0].duration.min(pair[1].duration);
            if transition_duration >= shorter / 2.0 {
                return Err(ReelError::invalid_parameter(format!(
                    "transition_duration {transition_duration}s must be shorter than half of the \
                     shorter adjacent clip (clips {i} and {}: {shorter}s)",
                    i + 1
                )));
            }
        }

        let mut starts = Vec::with_capacity(clips.len());
        let mut cursor = 0.0;
        for clip in &clips {
            starts.push(cursor);
            cursor += clip.duration - transition_duration;
        }
        let total = cursor + transition_duration;

        Ok(Self {
            clips,
            transition_duration,
            starts,
            total,
        })
    }

    /// Clips in playback order.
    pub fn clips(&self) -> &[ClipSpec] {
        &self.clips
    }

    /// Overlap between adjacent clips, seconds.
    pub fn transition_duration(&self) -> f64 {
        self.transition_duration
    }

    /// Total output length in seconds.
    pub fn total_duration(&self) -> f64 {
        self.total
    }

    /// Timeline time range covered by clip `idx`.
    pub fn clip_range(&self, idx: usize) -> Option<TimeRange> {
        let start = *self.starts.get(idx)?;
        Some(TimeRange {
            start,
            end: start + self.clips[idx].duration,
        })
    }

    /// Crossfade window between clip `idx` and clip `idx + 1`, if both exist and the overlap is
    /// non-zero.
    pub fn transition_window(&self, idx: usize) -> Option<TimeRange> {
        if self.transition_duration <= 0.0 || idx + 1 >= self.clips.len() {
            return None;
        }
        let start = self.starts[idx + 1];
        Some(TimeRange {
            start,
            end: self.starts[idx] + self.clips[idx].duration,
        })
    }

    /// All crossfade windows in timeline order (`N - 1` of them when the overlap is non-zero).
    pub fn transition_windows(&self) -> Vec<TimeRange> {
        (0..self.clips.len().saturating_sub(1))
            .filter_map(|i| self.transition_window(i))
            .collect()
    }

    /// Decoded source bytes held by the clips. Images shared between clips count once.
    pub fn held_source_bytes(&self) -> u64 {
        let mut seen = BTreeSet::new();
        self.clips
            .iter()
            .filter_map(|c| match &c.source {
                ClipSource::Image(img) => seen.insert(img.data().as_ptr()).then_some(&c.source),
                ClipSource::Video { .. } => None,
            })
            .map(ClipSource::held_bytes)
            .sum()
    }

    /// Largest frame any clip decodes on demand.
    pub(crate) fn max_decoded_frame_bytes(&self) -> u64 {
        self.clips
            .iter()
            .map(|c| c.source.decoded_frame_bytes())
            .max()
            .unwrap_or(0)
    }

    /// Number of frames sampled from `[0, total)` at `fps`.
    pub fn frame_count(&self, fps: Fps) -> u64 {
        fps.secs_to_frames_ceil(self.total)
    }

    /// Map timeline time `t` to the clip(s) visible at that instant.
    pub fn locate(&self, t: f64) -> ReelResult<Located> {
        if !t.is_finite() || t < 0.0 || t >= self.total {
            return Err(ReelError::invalid_parameter(format!(
                "locate time {t} is outside [0, {})",
                self.total
            )));
        }

        // Last clip whose start is <= t.
        let idx = self.starts.partition_point(|&s| s <= t).saturating_sub(1);
        let local = ClipTime {
            clip: idx,
            local_secs: t - self.starts[idx],
        };

        if idx > 0
            && let Some(window) = self.transition_window(idx - 1)
            && t < window.end
        {
            let outgoing = ClipTime {
                clip: idx - 1,
                local_secs: t - self.starts[idx - 1],
            };
            let alpha = crate::effects::composite::crossfade_alpha(window, t);
            return Ok(Located::Transition {
                outgoing,
                incoming: local,
                alpha,
            });
        }

        Ok(Located::Single(local))
    }
}

fn prefix_clip_error(idx: usize, err: ReelError) -> ReelError {
    match err {
        ReelError::InvalidParameter(msg) => {
            ReelError::InvalidParameter(format!("clip {idx}: {msg}"))
        }
        ReelError::InvalidInput(msg) => ReelError::InvalidInput(format!("clip {idx}: {msg}")),
        other => other,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/timeline.rs"]
mod tests;
