use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::composition::timeline::{ClipTime, Located, Timeline};
use crate::effects::composite::{crossfade_in_place, fade_in_place};
use crate::effects::zoom::{apply_zoom, clip_scale_at, fade_factor};
use crate::encode::sink::FrameSink;
use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange};
use crate::foundation::error::{ReelError, ReelResult};
use crate::host::CancelFlag;
use crate::render::frame::FrameRGBA;

/// Upper bound on full-canvas buffers one worker holds while rendering a frame: two cached
/// stills, two zoomed clip frames and the frame being encoded.
pub(crate) const FRAMES_IN_FLIGHT_PER_WORKER: u64 = 5;

/// Estimated decoded bytes held at once while `workers` segments of `timeline` render
/// concurrently: the decoded sources the timeline keeps for the whole render, plus per worker the
/// canvas buffers in flight and up to two freshly decoded video frames.
pub(crate) fn estimated_buffered_bytes(timeline: &Timeline, canvas: Canvas, workers: usize) -> u64 {
    let per_worker = FRAMES_IN_FLIGHT_PER_WORKER
        .saturating_mul(canvas.frame_bytes())
        .saturating_add(timeline.max_decoded_frame_bytes().saturating_mul(2));
    timeline
        .held_source_bytes()
        .saturating_add((workers as u64).saturating_mul(per_worker))
}

/// Normalized stills of the clips a render is currently touching, keyed by clip index.
///
/// Frames are rendered in increasing time order, so once the lowest visible clip index moves
/// past a clip it is never needed again and its buffer is dropped.
#[derive(Debug)]
pub struct FrameCache {
    canvas: Canvas,
    stills: BTreeMap<usize, FrameRGBA>,
}

impl FrameCache {
    /// Empty cache for frames normalized to `canvas`.
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            stills: BTreeMap::new(),
        }
    }

    /// Number of stills currently held.
    pub fn len(&self) -> usize {
        self.stills.len()
    }

    /// `true` when no still is held.
    pub fn is_empty(&self) -> bool {
        self.stills.is_empty()
    }

    /// Drop every still for clips before `clip`.
    pub fn evict_below(&mut self, clip: usize) {
        self.stills = self.stills.split_off(&clip);
    }

    fn base_frame<'a>(
        &'a mut self,
        timeline: &Timeline,
        at: ClipTime,
    ) -> ReelResult<Cow<'a, FrameRGBA>> {
        let source = &timeline.clips()[at.clip].source;
        if !source.is_static() {
            return Ok(Cow::Owned(source.frame_at(at.local_secs, self.canvas)?));
        }
        if !self.stills.contains_key(&at.clip) {
            let frame = source.frame_at(at.local_secs, self.canvas)?;
            self.stills.insert(at.clip, frame);
        }
        self.stills
            .get(&at.clip)
            .map(Cow::Borrowed)
            .ok_or_else(|| ReelError::invalid_input("frame cache lost a still (unexpected)"))
    }
}

/// Per-frame checks shared by every frame of a render: host cancellation, failure of an earlier
/// segment and the wall-clock budget.
#[derive(Clone, Debug, Default)]
pub struct RenderControl {
    cancel: Option<CancelFlag>,
    // Lowest failed segment index (usize::MAX while none failed) and this segment's index.
    first_failed: Option<(Arc<AtomicUsize>, usize)>,
    deadline: Option<Instant>,
}

impl RenderControl {
    /// Control that never stops a render.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop with [`ReelError::Cancelled`] once `flag` is set.
    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Stop with [`ReelError::ResourceExhausted`] once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stop once a segment ordered before `segment` has failed. Later failures do not stop it, so
    /// the earliest failure in timeline order always surfaces.
    pub(crate) fn for_segment(mut self, first_failed: Arc<AtomicUsize>, segment: usize) -> Self {
        self.first_failed = Some((first_failed, segment));
        self
    }

    pub(crate) fn host_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    /// Fail if the render must stop before the next frame.
    pub fn check(&self) -> ReelResult<()> {
        let earlier_failed = self
            .first_failed
            .as_ref()
            .is_some_and(|(failed, segment)| failed.load(Ordering::SeqCst) < *segment);
        if self.host_cancelled() || earlier_failed {
            return Err(ReelError::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(ReelError::resource_exhausted(
                "render exceeded limits.max_render_secs",
            ));
        }
        Ok(())
    }
}

/// Render frame `idx` of `timeline`, sampled at `idx / fps`, at `canvas` resolution.
pub fn render_frame(
    timeline: &Timeline,
    idx: FrameIndex,
    fps: Fps,
    canvas: Canvas,
) -> ReelResult<FrameRGBA> {
    let mut cache = FrameCache::new(canvas);
    render_frame_cached(timeline, idx, fps, &mut cache)
}

fn render_frame_cached(
    timeline: &Timeline,
    idx: FrameIndex,
    fps: Fps,
    cache: &mut FrameCache,
) -> ReelResult<FrameRGBA> {
    let t = fps.frame_time_secs(idx);
    match timeline.locate(t)? {
        Located::Single(at) => {
            cache.evict_below(at.clip);
            clip_frame(timeline, at, cache)
        }
        Located::Transition {
            outgoing,
            incoming,
            alpha,
        } => {
            cache.evict_below(outgoing.clip);
            let mut out = clip_frame(timeline, outgoing, cache)?;
            let inc = clip_frame(timeline, incoming, cache)?;
            crossfade_in_place(&mut out, &inc, alpha)?;
            Ok(out)
        }
    }
}

fn clip_frame(timeline: &Timeline, at: ClipTime, cache: &mut FrameCache) -> ReelResult<FrameRGBA> {
    let clip = &timeline.clips()[at.clip];
    let scale = clip_scale_at(clip, at.local_secs)?;
    let base = cache.base_frame(timeline, at)?;
    let mut frame = apply_zoom(&base, scale)?;
    fade_in_place(&mut frame, fade_factor(clip, at.local_secs));
    Ok(frame)
}

fn check_range(timeline: &Timeline, range: FrameRange, fps: Fps) -> ReelResult<()> {
    let total = timeline.frame_count(fps);
    if range.end.0 > total {
        return Err(ReelError::invalid_parameter(format!(
            "frame range [{}, {}) exceeds the timeline's {total} frames",
            range.start.0, range.end.0
        )));
    }
    Ok(())
}

/// Render `range` in order into an already-begun `sink`. Returns the number of frames pushed.
///
/// `control` is checked before every frame; the sink is left open on both success and failure.
pub fn render_range(
    timeline: &Timeline,
    range: FrameRange,
    fps: Fps,
    canvas: Canvas,
    sink: &mut dyn FrameSink,
    control: &RenderControl,
) -> ReelResult<u64> {
    check_range(timeline, range, fps)?;
    let mut cache = FrameCache::new(canvas);
    let mut pushed = 0u64;
    for idx in range.iter() {
        control.check()?;
        let frame = render_frame_cached(timeline, idx, fps, &mut cache)?;
        sink.push_frame(idx, &frame)?;
        pushed += 1;
    }
    Ok(pushed)
}

/// Render `range` into memory. Intended for previews and tests; memory grows with the range.
pub fn render_frames(
    timeline: &Timeline,
    range: FrameRange,
    fps: Fps,
    canvas: Canvas,
) -> ReelResult<Vec<FrameRGBA>> {
    check_range(timeline, range, fps)?;
    let mut cache = FrameCache::new(canvas);
    range
        .iter()
        .map(|idx| render_frame_cached(timeline, idx, fps, &mut cache))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
