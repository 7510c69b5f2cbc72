use crate::foundation::error::{ReelError, ReelResult};

/// Tolerance used when snapping seconds onto the frame grid.
///
/// Durations such as `0.1 * 30` land a hair off an integer in `f64`; anything closer than this is
/// treated as exactly on the grid.
pub(crate) const FRAME_EPS: f64 = 1e-6;

/// Absolute 0-based frame index in timeline space.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open frame range `[start, end)` in timeline space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// Inclusive range start.
    pub start: FrameIndex,
    /// Exclusive range end.
    pub end: FrameIndex,
}

impl FrameRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> ReelResult<Self> {
        if start.0 > end.0 {
            return Err(ReelError::invalid_parameter(
                "FrameRange start must be <= end",
            ));
        }
        Ok(Self { start, end })
    }

    /// Number of frames contained in the range.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// Return `true` when the range has no frames.
    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// Return `true` when `f` is inside `[start, end)`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }

    /// Iterate the frame indices of the range in order.
    pub fn iter(self) -> impl Iterator<Item = FrameIndex> {
        (self.start.0..self.end.0).map(FrameIndex)
    }
}

/// Half-open time range `[start, end)` in seconds of timeline time.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    /// Inclusive start, seconds.
    pub start: f64,
    /// Exclusive end, seconds.
    pub end: f64,
}

impl TimeRange {
    /// Create a validated range with finite bounds and `start <= end`.
    pub fn new(start: f64, end: f64) -> ReelResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(ReelError::invalid_parameter(
                "TimeRange bounds must be finite",
            ));
        }
        if start > end {
            return Err(ReelError::invalid_parameter("TimeRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Length of the range in seconds.
    pub fn len_secs(self) -> f64 {
        self.end - self.start
    }

    /// Return `true` when `t` is inside `[start, end)`.
    pub fn contains(self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    /// Return `true` when `t` lies strictly between the bounds.
    pub fn strictly_contains(self, t: f64) -> bool {
        self.start + FRAME_EPS < t && t < self.end - FRAME_EPS
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> ReelResult<Self> {
        if den == 0 {
            return Err(ReelError::invalid_parameter("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(ReelError::invalid_parameter("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Integer frame rate.
    pub fn integer(fps: u32) -> ReelResult<Self> {
        Self::new(fps, 1)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Convert frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * f64::from(self.den) / f64::from(self.num)
    }

    /// Presentation time of frame `idx`.
    pub fn frame_time_secs(self, idx: FrameIndex) -> f64 {
        self.frames_to_secs(idx.0)
    }

    /// Convert seconds to frame count using floor semantics.
    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        let x = secs * self.as_f64();
        let r = x.round();
        if (x - r).abs() <= FRAME_EPS {
            return r.max(0.0) as u64;
        }
        x.floor().max(0.0) as u64
    }

    /// Number of frame instants `i / fps` strictly below `secs`.
    pub fn secs_to_frames_ceil(self, secs: f64) -> u64 {
        let x = secs * self.as_f64();
        let r = x.round();
        if (x - r).abs() <= FRAME_EPS {
            return r.max(0.0) as u64;
        }
        x.ceil().max(0.0) as u64
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Byte size of one RGBA8 frame at this resolution.
    pub fn frame_bytes(self) -> u64 {
        u64::from(self.width) * u64::from(self.height) * 4
    }

    /// Reject empty canvases.
    pub fn validate(self) -> ReelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ReelError::invalid_parameter(format!(
                "canvas must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
