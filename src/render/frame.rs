use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};

/// A rendered frame as opaque RGBA8 pixels, tightly packed and row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes.
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// Wrap `data`, checking it holds exactly `width * height` RGBA8 pixels.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> ReelResult<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(ReelError::invalid_input(format!(
                "frame buffer is {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Opaque black frame covering `canvas`.
    pub fn black(canvas: Canvas) -> Self {
        let mut data = vec![0u8; canvas.frame_bytes() as usize];
        for px in data.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self {
            width: canvas.width,
            height: canvas.height,
            data,
        }
    }

    /// Canvas this frame covers.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Pixel at `(x, y)`; callers keep coordinates in bounds.
    pub(crate) fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }
}
