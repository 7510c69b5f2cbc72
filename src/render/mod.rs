//! Frame rendering and the chunked render driver.

/// Segment planning and the chunked renderer.
pub mod chunked;
/// Rendered frame buffers.
pub mod frame;
/// Per-frame rendering of a timeline.
pub mod pipeline;
