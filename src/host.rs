//! The boundary between the render core and whatever embeds it.
//!
//! The core only needs to read asset bytes, hand over the finished artifact, and report
//! progress. [`FsHost`] is the filesystem-backed host used by the CLI.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context as _;

use crate::assets::image::{ImageAsset, decode_image};
use crate::encode::Artifact;
use crate::encode::ffmpeg::ensure_parent_dir;
use crate::foundation::error::{ReelError, ReelResult};

/// Callbacks the render core requires from its host.
///
/// `progress` may be called from render worker threads.
pub trait RenderHost: Sync {
    /// Fetch the raw (encoded) bytes of `asset`.
    fn read(&self, asset: &str) -> ReelResult<Vec<u8>>;

    /// Deliver the finished artifact.
    fn write(&self, artifact: &Artifact) -> ReelResult<()>;

    /// Called once per finished segment with `current` in `1..=total`.
    fn progress(&self, current: usize, total: usize) {
        let _ = (current, total);
    }

    /// Flag polled once per rendered frame; setting it aborts the render.
    fn cancel_flag(&self) -> Option<&CancelFlag> {
        None
    }
}

/// Shared cancellation flag. Clones observe the same state.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag that is not yet cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// `true` once [`CancelFlag::cancel`] was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Host reading assets from local paths and writing the artifact to `out_path`.
#[derive(Debug)]
pub struct FsHost {
    out_path: PathBuf,
    cancel: CancelFlag,
}

impl FsHost {
    /// Host delivering the artifact to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            cancel: CancelFlag::new(),
        }
    }

    /// Where the artifact is written.
    pub fn out_path(&self) -> &std::path::Path {
        &self.out_path
    }

    /// Handle for cancelling renders driven by this host.
    pub fn cancel_handle(&self) -> CancelFlag {
        self.cancel.clone()
    }
}

impl RenderHost for FsHost {
    fn read(&self, asset: &str) -> ReelResult<Vec<u8>> {
        std::fs::read(asset)
            .map_err(|e| ReelError::invalid_input(format!("failed to read asset '{asset}': {e}")))
    }

    fn write(&self, artifact: &Artifact) -> ReelResult<()> {
        ensure_parent_dir(&self.out_path)?;
        std::fs::write(&self.out_path, &artifact.bytes)
            .with_context(|| format!("write artifact '{}'", self.out_path.display()))?;
        tracing::info!(
            out = %self.out_path.display(),
            bytes = artifact.bytes.len(),
            frames = artifact.frame_count,
            "artifact written"
        );
        Ok(())
    }

    fn progress(&self, current: usize, total: usize) {
        tracing::info!(current, total, "segment finished");
    }

    fn cancel_flag(&self) -> Option<&CancelFlag> {
        Some(&self.cancel)
    }
}

/// Read and decode `refs` through `host`, preserving order.
pub fn load_images<S: AsRef<str>>(
    host: &dyn RenderHost,
    refs: &[S],
) -> ReelResult<Vec<ImageAsset>> {
    refs.iter()
        .map(|r| {
            let r = r.as_ref();
            let bytes = host.read(r)?;
            decode_image(&bytes).map_err(|e| match e {
                ReelError::InvalidInput(msg) => ReelError::invalid_input(format!("'{r}': {msg}")),
                other => other,
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "../tests/unit/host.rs"]
mod tests;
