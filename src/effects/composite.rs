use crate::foundation::core::TimeRange;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::{add_sat_u8, mul_div255_u16, unit_to_u8_weight};
use crate::render::frame::FrameRGBA;

/// Crossfade weight of the incoming clip at timeline time `t` inside `window`.
///
/// Ramps linearly from 0 at `window.start` to 1 at `window.end`; an empty window is a hard cut.
pub fn crossfade_alpha(window: TimeRange, t: f64) -> f64 {
    let len = window.len_secs();
    if len <= 0.0 {
        return 1.0;
    }
    ((t - window.start) / len).clamp(0.0, 1.0)
}

/// `(1 - alpha) * a + alpha * b` for one RGBA8 pixel.
pub fn crossfade(a: [u8; 4], b: [u8; 4], alpha: f64) -> [u8; 4] {
    let tt = unit_to_u8_weight(alpha);
    let it = 255u16 - tt;

    let mut out = [0u8; 4];
    for i in 0..4 {
        let av = mul_div255_u16(u16::from(a[i]), it);
        let bv = mul_div255_u16(u16::from(b[i]), tt);
        out[i] = add_sat_u8(av, bv);
    }
    out
}

/// Blend `incoming` into `outgoing` in place with weight `alpha`.
pub fn crossfade_in_place(
    outgoing: &mut FrameRGBA,
    incoming: &FrameRGBA,
    alpha: f64,
) -> ReelResult<()> {
    if outgoing.width != incoming.width || outgoing.height != incoming.height {
        return Err(ReelError::invalid_input(format!(
            "crossfade expects equal-size frames, got {}x{} and {}x{}",
            outgoing.width, outgoing.height, incoming.width, incoming.height
        )));
    }
    for (d, s) in outgoing
        .data
        .chunks_exact_mut(4)
        .zip(incoming.data.chunks_exact(4))
    {
        let out = crossfade([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], alpha);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Darken `frame` toward black by `factor` (1 keeps it, 0 is black). Alpha is untouched.
pub fn fade_in_place(frame: &mut FrameRGBA, factor: f64) {
    let k = unit_to_u8_weight(factor);
    if k == 255 {
        return;
    }
    for px in frame.data.chunks_exact_mut(4) {
        for c in &mut px[..3] {
            *c = mul_div255_u16(u16::from(*c), k) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
