use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::encode::ffmpeg::ensure_parent_dir;
use crate::encode::sink::{EncodeSettings, FrameSink, check_frame};
use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::frame::FrameRGBA;

const FRAME_MARKER: &[u8] = b"FRAME\n";

/// Sink writing an uncompressed YUV4MPEG2 stream (4:4:4, BT.601 limited range).
///
/// Needs no external tools, and streams with identical headers concatenate by dropping every
/// header but the first.
pub struct Y4mSink {
    out_path: PathBuf,
    writer: Option<BufWriter<File>>,
    settings: Option<EncodeSettings>,
    last_idx: Option<FrameIndex>,
    planes: Vec<u8>,
}

impl Y4mSink {
    /// Create a sink writing to `out_path` (overwritten if present).
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            writer: None,
            settings: None,
            last_idx: None,
            planes: Vec::new(),
        }
    }
}

impl FrameSink for Y4mSink {
    fn begin(&mut self, settings: EncodeSettings) -> ReelResult<()> {
        settings.validate()?;
        ensure_parent_dir(&self.out_path)?;
        let file = File::create(&self.out_path).map_err(|e| {
            ReelError::encode(format!(
                "failed to create '{}': {e}",
                self.out_path.display()
            ))
        })?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(header_line(&settings).as_bytes())
            .map_err(|e| ReelError::encode(format!("failed to write y4m header: {e}")))?;

        self.planes = vec![0u8; yuv444_frame_bytes(settings.canvas)];
        self.writer = Some(writer);
        self.settings = Some(settings);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| ReelError::encode("y4m sink not started"))?;
        check_frame(settings, &mut self.last_idx, idx, frame)?;

        rgba_to_yuv444_planes(&frame.data, &mut self.planes);
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ReelError::encode("y4m sink is already finalized"))?;
        writer
            .write_all(FRAME_MARKER)
            .and_then(|()| writer.write_all(&self.planes))
            .map_err(|e| ReelError::encode(format!("failed to write y4m frame: {e}")))
    }

    fn end(&mut self) -> ReelResult<()> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| ReelError::encode("y4m sink not started"))?;
        let file = writer
            .into_inner()
            .map_err(|e| ReelError::encode(format!("failed to flush y4m stream: {e}")))?;
        file.sync_all()
            .map_err(|e| ReelError::encode(format!("failed to sync y4m stream: {e}")))?;
        self.settings = None;
        Ok(())
    }
}

/// Stream header for `settings`, including the trailing newline.
pub(crate) fn header_line(settings: &EncodeSettings) -> String {
    format!(
        "YUV4MPEG2 W{} H{} F{}:{} Ip A1:1 C444\n",
        settings.canvas.width, settings.canvas.height, settings.fps.num, settings.fps.den
    )
}

/// Read the header line of a y4m stream, leaving `reader` at the first frame.
pub(crate) fn read_header_line(reader: &mut impl BufRead, path: &Path) -> ReelResult<Vec<u8>> {
    let mut line = Vec::new();
    reader
        .read_until(b'\n', &mut line)
        .map_err(|e| ReelError::concat(format!("failed to read '{}': {e}", path.display())))?;
    if !line.starts_with(b"YUV4MPEG2 ") || !line.ends_with(b"\n") {
        return Err(ReelError::concat(format!(
            "'{}' is not a YUV4MPEG2 stream",
            path.display()
        )));
    }
    Ok(line)
}

/// Bytes of the three full-resolution planes of one frame.
fn yuv444_frame_bytes(canvas: Canvas) -> usize {
    (canvas.width as usize) * (canvas.height as usize) * 3
}

/// Convert packed RGBA8 into planar Y, Cb, Cr (full resolution each).
fn rgba_to_yuv444_planes(rgba: &[u8], planes: &mut [u8]) {
    let n = rgba.len() / 4;
    let (y_plane, rest) = planes.split_at_mut(n);
    let (u_plane, v_plane) = rest.split_at_mut(n);
    for (i, px) in rgba.chunks_exact(4).enumerate() {
        let r = i32::from(px[0]);
        let g = i32::from(px[1]);
        let b = i32::from(px[2]);
        y_plane[i] = (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16) as u8;
        u_plane[i] = (((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128) as u8;
        v_plane[i] = (((112 * r - 94 * g - 18 * b + 128) >> 8) + 128) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/y4m.rs"]
mod tests;
