//! Clip specifications, the timeline they are laid out on, and request assembly.

pub(crate) mod assemble;
pub(crate) mod clip;
pub(crate) mod timeline;
