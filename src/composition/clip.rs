use crate::assets::source::ClipSource;
use crate::effects::zoom::{EffectDescriptor, zoom_descriptor};
use crate::foundation::error::{ReelError, ReelResult};

/// Render instructions for one source: how long it plays, how far it zooms, how it fades.
#[derive(Clone, Debug)]
pub struct ClipSpec {
    /// Frame provider.
    pub source: ClipSource,
    /// Clip length in seconds, `> 0`.
    pub duration: f64,
    /// Scale reached at the end of the clip, `>= 1.0`.
    pub zoom_factor: f64,
    /// Fade-from-black length in seconds.
    pub fade_in: f64,
    /// Fade-to-black length in seconds.
    pub fade_out: f64,
}

impl ClipSpec {
    /// A clip with no zoom and no fades.
    pub fn new(source: ClipSource, duration: f64) -> Self {
        Self {
            source,
            duration,
            zoom_factor: 1.0,
            fade_in: 0.0,
            fade_out: 0.0,
        }
    }

    /// Set the end-of-clip zoom factor.
    pub fn with_zoom(mut self, zoom_factor: f64) -> Self {
        self.zoom_factor = zoom_factor;
        self
    }

    /// Set fade-in and fade-out lengths.
    pub fn with_fades(mut self, fade_in: f64, fade_out: f64) -> Self {
        self.fade_in = fade_in;
        self.fade_out = fade_out;
        self
    }

    /// The zoom effect this clip applies, as data.
    pub fn effect(&self) -> EffectDescriptor {
        zoom_descriptor(self)
    }

    /// Check parameter ranges and the source.
    pub fn validate(&self) -> ReelResult<()> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(ReelError::invalid_parameter(format!(
                "clip duration must be finite and > 0, got {}",
                self.duration
            )));
        }
        if !self.zoom_factor.is_finite() || self.zoom_factor < 1.0 {
            return Err(ReelError::invalid_parameter(format!(
                "zoom_factor must be finite and >= 1.0, got {}",
                self.zoom_factor
            )));
        }
        for (name, v) in [("fade_in", self.fade_in), ("fade_out", self.fade_out)] {
            if !v.is_finite() || v < 0.0 {
                return Err(ReelError::invalid_parameter(format!(
                    "{name} must be finite and >= 0, got {v}"
                )));
            }
        }
        if self.fade_in + self.fade_out > self.duration {
            return Err(ReelError::invalid_parameter(format!(
                "fade_in + fade_out ({} + {}) exceeds clip duration {}",
                self.fade_in, self.fade_out, self.duration
            )));
        }
        self.source.validate()
    }
}
