use kurbo::{Affine, Point, Vec2};

use crate::composition::clip::ClipSpec;
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::frame::FrameRGBA;

/// Serializable per-clip effect, evaluated by [`scale_at`].
///
/// ```json
/// { "kind": "zoom", "start_scale": 1.0, "end_scale": 1.2, "duration": 2.0 }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectDescriptor {
    /// Linear scale ramp about the frame center.
    Zoom {
        /// Scale at local time zero.
        start_scale: f64,
        /// Scale at local time `duration`.
        end_scale: f64,
        /// Ramp length in seconds.
        duration: f64,
    },
}

impl EffectDescriptor {
    /// Zoom ramp from `1.0` to `zoom_factor` over `duration` seconds.
    pub fn zoom(zoom_factor: f64, duration: f64) -> Self {
        Self::Zoom {
            start_scale: 1.0,
            end_scale: zoom_factor,
            duration,
        }
    }

    /// Check the descriptor can be evaluated.
    pub fn validate(&self) -> ReelResult<()> {
        match *self {
            Self::Zoom {
                start_scale,
                end_scale,
                duration,
            } => {
                if !duration.is_finite() || duration <= 0.0 {
                    return Err(ReelError::invalid_parameter(format!(
                        "zoom duration must be finite and > 0, got {duration}"
                    )));
                }
                for (name, v) in [("start_scale", start_scale), ("end_scale", end_scale)] {
                    if !v.is_finite() || v <= 0.0 {
                        return Err(ReelError::invalid_parameter(format!(
                            "zoom {name} must be finite and > 0, got {v}"
                        )));
                    }
                }
                Ok(())
            }
        }
    }
}

/// Scale produced by `effect` at local time `t`.
///
/// `t` is clamped into `[0, duration]`.
pub fn scale_at(effect: &EffectDescriptor, t: f64) -> ReelResult<f64> {
    effect.validate()?;
    if !t.is_finite() {
        return Err(ReelError::invalid_parameter(format!(
            "effect time must be finite, got {t}"
        )));
    }
    match *effect {
        EffectDescriptor::Zoom {
            start_scale,
            end_scale,
            duration,
        } => {
            let u = (t / duration).clamp(0.0, 1.0);
            Ok(start_scale + (end_scale - start_scale) * u)
        }
    }
}

/// The zoom effect a clip carries.
pub fn zoom_descriptor(clip: &ClipSpec) -> EffectDescriptor {
    EffectDescriptor::zoom(clip.zoom_factor, clip.duration)
}

/// `s(t)` for `clip`: `1 + (zoom_factor - 1) * t / duration`.
pub fn clip_scale_at(clip: &ClipSpec, t: f64) -> ReelResult<f64> {
    scale_at(&zoom_descriptor(clip), t)
}

/// Brightness multiplier from the clip's fade-in/fade-out at local time `t`.
pub fn fade_factor(clip: &ClipSpec, t: f64) -> f64 {
    let mut f: f64 = 1.0;
    if clip.fade_in > 0.0 {
        f = f.min(t / clip.fade_in);
    }
    if clip.fade_out > 0.0 {
        f = f.min((clip.duration - t) / clip.fade_out);
    }
    f.clamp(0.0, 1.0)
}

/// Map from output pixel-center coordinates to source coordinates for a center zoom.
pub fn zoom_sample_transform(scale: f64, width: u32, height: u32) -> ReelResult<Affine> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(ReelError::invalid_parameter(format!(
            "zoom scale must be finite and > 0, got {scale}"
        )));
    }
    let center = Vec2::new(f64::from(width) / 2.0, f64::from(height) / 2.0);
    Ok(Affine::translate(center) * Affine::scale(1.0 / scale) * Affine::translate(-center))
}

/// Render `src` magnified by `scale` about its center, at the same resolution.
pub fn apply_zoom(src: &FrameRGBA, scale: f64) -> ReelResult<FrameRGBA> {
    let to_source = zoom_sample_transform(scale, src.width, src.height)?;
    if scale == 1.0 {
        return Ok(src.clone());
    }

    let mut data = Vec::with_capacity(src.data.len());
    for y in 0..src.height {
        for x in 0..src.width {
            let p = to_source * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            data.extend_from_slice(&sample_bilinear(src, p.x - 0.5, p.y - 0.5));
        }
    }
    FrameRGBA::new(src.width, src.height, data)
}

fn sample_bilinear(src: &FrameRGBA, x: f64, y: f64) -> [u8; 4] {
    let x = x.clamp(0.0, f64::from(src.width - 1));
    let y = y.clamp(0.0, f64::from(src.height - 1));
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(src.width - 1);
    let y1 = (y0 + 1).min(src.height - 1);
    let fx = x - f64::from(x0);
    let fy = y - f64::from(y0);

    let p00 = src.pixel(x0, y0);
    let p10 = src.pixel(x1, y0);
    let p01 = src.pixel(x0, y1);
    let p11 = src.pixel(x1, y1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(p00[c]) * (1.0 - fx) + f64::from(p10[c]) * fx;
        let bottom = f64::from(p01[c]) * (1.0 - fx) + f64::from(p11[c]) * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/effects/zoom.rs"]
mod tests;
