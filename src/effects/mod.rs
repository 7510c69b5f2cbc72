//! Per-clip effects and the two-clip crossfade compositor.

pub(crate) mod composite;
pub(crate) mod zoom;
