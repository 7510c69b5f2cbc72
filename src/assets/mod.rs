//! Source assets: decoded images, video providers and the clip-level source wrapper.

pub(crate) mod image;
pub(crate) mod source;
pub(crate) mod video;
