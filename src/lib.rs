//! stillreel turns an ordered set of still images (or one long video) into a single video.
//!
//! Every clip gets a linear zoom ramp and optional fades, adjacent clips crossfade over a shared
//! transition window, and long timelines can be rendered in bounded segments that are joined
//! back together. The public API is small:
//!
//! - Build a [`Timeline`] from [`ClipSpec`]s (or assemble one with [`build_timeline`])
//! - Describe the render with a [`RenderConfig`]
//! - Call [`render`] / [`render_timeline`] with a [`RenderHost`], or drive a [`ChunkedRenderer`]
//!   directly
//!
//! Chunked renders sample frame `i` at `i / fps` regardless of segmentation, so joining the
//! segments reproduces an unchunked render frame for frame.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod assets;
pub(crate) mod composition;
/// Render configuration record and its parts.
pub mod config;
pub(crate) mod effects;
/// Encoding sinks, segment joining and the final artifact.
pub mod encode;
/// Host callbacks and the filesystem host.
pub mod host;
/// Frame rendering and the chunked render driver.
pub mod render;

pub use kurbo::Affine;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange, TimeRange};
pub use crate::foundation::error::{ErrorKind, ReelError, ReelResult};

pub use crate::assets::image::{ImageAsset, PixelFormat, decode_image, normalize_to_canvas};
pub use crate::assets::source::ClipSource;
pub use crate::assets::video::{
    FfmpegVideoSource, FrameSequenceSource, VideoInfo, VideoSource, probe_video,
};
pub use crate::composition::assemble::{
    RenderInput, build_timeline, clips_from_images, split_video,
};
pub use crate::composition::clip::ClipSpec;
pub use crate::composition::timeline::{ClipTime, Located, Timeline};
pub use crate::effects::composite::{crossfade, crossfade_alpha, crossfade_in_place, fade_in_place};
pub use crate::effects::zoom::{
    EffectDescriptor, apply_zoom, clip_scale_at, fade_factor, scale_at, zoom_descriptor,
    zoom_sample_transform,
};

pub use crate::config::{OutputFormat, RenderConfig, RenderLimits, RenderThreading};
pub use crate::encode::concat::{JoinMode, SegmentArtifact, join_artifacts};
pub use crate::encode::ffmpeg::FfmpegSink;
pub use crate::encode::sink::{EncodeSettings, FrameSink, InMemorySink};
pub use crate::encode::y4m::Y4mSink;
pub use crate::encode::{Artifact, check_encoder_available, open_sink};
pub use crate::host::{CancelFlag, FsHost, RenderHost, load_images};
pub use crate::render::chunked::{
    ChunkedRenderer, RenderSegment, plan_segments, render, render_timeline,
};
pub use crate::render::frame::FrameRGBA;
pub use crate::render::pipeline::{
    FrameCache, RenderControl, render_frame, render_frames, render_range,
};
