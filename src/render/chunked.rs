use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use rayon::prelude::*;

use crate::composition::assemble::{RenderInput, build_timeline};
use crate::composition::timeline::Timeline;
use crate::config::RenderConfig;
use crate::encode::concat::{SegmentArtifact, join_artifacts};
use crate::encode::sink::EncodeSettings;
use crate::encode::{Artifact, check_encoder_available, open_sink};
use crate::foundation::core::{Fps, FrameIndex, FrameRange, TimeRange};
use crate::foundation::error::{ReelError, ReelResult};
use crate::host::RenderHost;
use crate::render::pipeline::{RenderControl, estimated_buffered_bytes, render_range};

/// A contiguous run of frames rendered and encoded on its own.
///
/// Frame `i` always shows timeline time `i / fps`, whichever segment it falls in, so the
/// concatenation of all segments equals an unchunked render.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct RenderSegment {
    /// Position in timeline order.
    pub index: usize,
    /// Frames `[start, end)` of the timeline.
    pub frames: FrameRange,
    /// Timeline time covered, `[start, end)`.
    pub time: TimeRange,
}

/// Partition the timeline's frames into segments no longer than `chunk_duration`.
///
/// A cut that would land strictly inside a transition window moves forward to the first frame at
/// or after the window end, so that segment may run longer than `chunk_duration`. Chunks shorter
/// than one frame period are rounded up to one frame.
pub fn plan_segments(
    timeline: &Timeline,
    fps: Fps,
    chunk_duration: f64,
) -> ReelResult<Vec<RenderSegment>> {
    if !chunk_duration.is_finite() || chunk_duration <= 0.0 {
        return Err(ReelError::invalid_parameter(format!(
            "chunk_duration must be finite and > 0, got {chunk_duration}"
        )));
    }
    let total_frames = total_frames(timeline, fps)?;
    let chunk_frames = fps.secs_to_frames_floor(chunk_duration).max(1);
    let windows = timeline.transition_windows();

    let mut out = Vec::new();
    let mut start = 0u64;
    while start < total_frames {
        let mut end = start.saturating_add(chunk_frames).min(total_frames);
        while end < total_frames {
            let cut = fps.frames_to_secs(end);
            let Some(window) = windows.iter().find(|w| w.strictly_contains(cut)) else {
                break;
            };
            end = fps
                .secs_to_frames_ceil(window.end)
                .max(end + 1)
                .min(total_frames);
        }
        out.push(segment(timeline, fps, out.len(), start, end, total_frames)?);
        start = end;
    }
    Ok(out)
}

fn whole_timeline(timeline: &Timeline, fps: Fps) -> ReelResult<Vec<RenderSegment>> {
    let total_frames = total_frames(timeline, fps)?;
    Ok(vec![segment(timeline, fps, 0, 0, total_frames, total_frames)?])
}

fn total_frames(timeline: &Timeline, fps: Fps) -> ReelResult<u64> {
    let n = timeline.frame_count(fps);
    if n == 0 {
        return Err(ReelError::invalid_parameter(format!(
            "timeline of {}s holds no frame at {} fps",
            timeline.total_duration(),
            fps.as_f64()
        )));
    }
    Ok(n)
}

fn segment(
    timeline: &Timeline,
    fps: Fps,
    index: usize,
    start: u64,
    end: u64,
    total_frames: u64,
) -> ReelResult<RenderSegment> {
    let end_secs = if end == total_frames {
        timeline.total_duration()
    } else {
        fps.frames_to_secs(end)
    };
    Ok(RenderSegment {
        index,
        frames: FrameRange::new(FrameIndex(start), FrameIndex(end))?,
        time: TimeRange::new(fps.frames_to_secs(start), end_secs)?,
    })
}

/// Renders a timeline segment by segment and joins the parts in timeline order.
///
/// Every check (parameters, admission limits, memory estimate, encoder availability) runs in
/// [`ChunkedRenderer::new`], before any scratch state exists.
#[derive(Debug)]
pub struct ChunkedRenderer<'a> {
    timeline: &'a Timeline,
    config: &'a RenderConfig,
    settings: EncodeSettings,
    segments: Vec<RenderSegment>,
}

impl<'a> ChunkedRenderer<'a> {
    /// Validate and plan a render of `timeline` under `config`.
    pub fn new(timeline: &'a Timeline, config: &'a RenderConfig) -> ReelResult<Self> {
        config.validate_output()?;
        let fps = config.fps()?;
        config
            .limits
            .admit(timeline.clips().len(), timeline.total_duration())?;

        let settings = EncodeSettings {
            canvas: config.canvas,
            fps,
            format: config.format,
        };
        settings.validate()?;

        let segments = match config.chunk_duration {
            Some(chunk) => plan_segments(timeline, fps, chunk)?,
            None => whole_timeline(timeline, fps)?,
        };

        let workers = config.threading.workers().min(segments.len()).max(1);
        let buffered = estimated_buffered_bytes(timeline, config.canvas, workers);
        if buffered > config.limits.max_buffered_bytes {
            return Err(ReelError::resource_exhausted(format!(
                "{workers} worker(s) at {}x{} with {} bytes of decoded sources would hold \
                 ~{buffered} bytes, above limits.max_buffered_bytes = {}",
                config.canvas.width,
                config.canvas.height,
                timeline.held_source_bytes(),
                config.limits.max_buffered_bytes
            )));
        }
        check_encoder_available(config.format)?;

        Ok(Self {
            timeline,
            config,
            settings,
            segments,
        })
    }

    /// Planned segments in timeline order.
    pub fn segments(&self) -> &[RenderSegment] {
        &self.segments
    }

    /// Render every segment, join them, and deliver the artifact through `host`.
    ///
    /// Intermediate files live in a per-render scratch directory that is removed on every exit
    /// path, including failure and cancellation.
    #[tracing::instrument(skip_all, fields(segments = self.segments.len(), format = ?self.settings.format))]
    pub fn render(&self, host: &dyn RenderHost) -> ReelResult<Artifact> {
        let started = Instant::now();
        let first_failed = Arc::new(AtomicUsize::new(usize::MAX));
        let mut control = RenderControl::new();
        if let Some(flag) = host.cancel_flag() {
            control = control.with_cancel(flag.clone());
        }
        if let Some(secs) = self.config.limits.max_render_secs {
            control = control.with_deadline(started + Duration::from_secs_f64(secs));
        }

        let scratch = TempDirGuard::create(&self.config.scratch_root())?;
        let total = self.segments.len();
        let done = AtomicUsize::new(0);
        let run = |seg: &RenderSegment| {
            let seg_control = control
                .clone()
                .for_segment(Arc::clone(&first_failed), seg.index);
            let res = self.render_segment(seg, scratch.path(), &seg_control);
            match &res {
                Ok(_) => host.progress(done.fetch_add(1, Ordering::SeqCst) + 1, total),
                Err(_) => {
                    first_failed.fetch_min(seg.index, Ordering::SeqCst);
                }
            }
            res
        };

        let workers = self.config.threading.workers().min(total);
        let outcomes: Vec<ReelResult<SegmentArtifact>> = if workers > 1 {
            let pool = build_thread_pool(Some(workers))?;
            pool.install(|| self.segments.par_iter().map(run).collect())
        } else {
            let mut outcomes = Vec::with_capacity(total);
            for seg in &self.segments {
                let res = run(seg);
                let failed = res.is_err();
                outcomes.push(res);
                if failed {
                    break;
                }
            }
            outcomes
        };

        let parts = self.collect_parts(outcomes, &control)?;
        control.check()?;

        let out_path = scratch
            .path()
            .join(format!("output.{}", self.settings.format.extension()));
        let mode = join_artifacts(&parts, &out_path)?;
        let bytes = std::fs::read(&out_path)
            .with_context(|| format!("read joined artifact '{}'", out_path.display()))?;
        drop(scratch);

        let artifact = Artifact {
            format: self.settings.format,
            canvas: self.settings.canvas,
            fps: self.settings.fps,
            frame_count: self.timeline.frame_count(self.settings.fps),
            bytes,
        };
        host.write(&artifact)?;
        tracing::info!(
            ?mode,
            frames = artifact.frame_count,
            bytes = artifact.bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "render finished"
        );
        Ok(artifact)
    }

    fn render_segment(
        &self,
        seg: &RenderSegment,
        scratch: &Path,
        control: &RenderControl,
    ) -> ReelResult<SegmentArtifact> {
        let path = scratch.join(format!(
            "segment_{:05}.{}",
            seg.index,
            self.settings.format.extension()
        ));
        tracing::debug!(
            segment = seg.index,
            start = seg.time.start,
            end = seg.time.end,
            frames = seg.frames.len_frames(),
            "rendering segment"
        );
        let mut sink = open_sink(&self.settings, &path)?;
        render_range(
            self.timeline,
            seg.frames,
            self.settings.fps,
            self.settings.canvas,
            sink.as_mut(),
            control,
        )?;
        sink.end()?;
        Ok(SegmentArtifact {
            range: seg.time,
            path,
            settings: self.settings.clone(),
        })
    }

    /// Keep timeline order. On failure report host cancellation first, then the earliest
    /// segment that failed on its own rather than because an earlier segment stopped the render.
    fn collect_parts(
        &self,
        outcomes: Vec<ReelResult<SegmentArtifact>>,
        control: &RenderControl,
    ) -> ReelResult<Vec<SegmentArtifact>> {
        if outcomes.iter().all(Result::is_ok) && outcomes.len() == self.segments.len() {
            return outcomes.into_iter().collect();
        }
        if control.host_cancelled() {
            tracing::info!("render cancelled by host");
            return Err(ReelError::Cancelled);
        }
        let mut first_failure = None;
        for (seg, res) in self.segments.iter().zip(outcomes) {
            match res {
                Err(ReelError::Cancelled) | Ok(_) => {}
                Err(e) => {
                    first_failure = Some(e.in_segment(seg.time));
                    break;
                }
            }
        }
        Err(first_failure.unwrap_or(ReelError::Cancelled))
    }
}

/// Render `timeline` under `config`, chunked when `config.chunk_duration` is set.
pub fn render_timeline(
    timeline: &Timeline,
    config: &RenderConfig,
    host: &dyn RenderHost,
) -> ReelResult<Artifact> {
    ChunkedRenderer::new(timeline, config)?.render(host)
}

/// Assemble clips from `input` and render them. Parameters are validated before assembly.
#[tracing::instrument(skip_all, fields(clips = input.clip_count(config)))]
pub fn render(
    input: RenderInput,
    config: &RenderConfig,
    host: &dyn RenderHost,
) -> ReelResult<Artifact> {
    config.validate()?;
    config.limits.admit(input.clip_count(config), 0.0)?;
    let timeline = build_timeline(input, config)?;
    render_timeline(&timeline, config, host)
}

fn build_thread_pool(threads: Option<usize>) -> ReelResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(ReelError::invalid_parameter(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build rayon thread pool: {e}").into())
}

/// Per-render scratch directory, removed with everything in it on drop.
struct TempDirGuard(PathBuf);

impl TempDirGuard {
    fn create(root: &Path) -> ReelResult<Self> {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let dir = root.join(format!(
            "stillreel_{}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0),
            NEXT.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create scratch directory '{}'", dir.display()))?;
        Ok(Self(dir))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.0) {
            tracing::warn!(
                dir = %self.0.display(),
                error = %e,
                "failed to remove scratch directory"
            );
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/chunked.rs"]
mod tests;
