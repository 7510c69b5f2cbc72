use std::sync::Arc;

use image::imageops::FilterType;

use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::frame::FrameRGBA;

/// Pixel layout of an [`ImageAsset`] buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 8-bit RGBA, straight alpha.
    Rgba8,
    /// 8-bit RGB.
    Rgb8,
    /// 8-bit grayscale.
    Luma8,
}

impl PixelFormat {
    /// Bytes used by one pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rgb8 => 3,
            Self::Luma8 => 1,
        }
    }
}

/// Immutable pixel buffer: the decoded form of one still image.
///
/// Cloning is cheap; the pixel data is shared.
#[derive(Clone, Debug)]
pub struct ImageAsset {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Arc<Vec<u8>>,
}

impl ImageAsset {
    /// Wrap a tightly packed, row-major pixel buffer.
    ///
    /// Fails with `InvalidInput` for zero-size images or a buffer whose length does not match
    /// `width * height * bytes_per_pixel`.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> ReelResult<Self> {
        if width == 0 || height == 0 {
            return Err(ReelError::invalid_input(format!(
                "image asset must be non-empty, got {width}x{height}"
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(format.bytes_per_pixel()))
            .ok_or_else(|| ReelError::invalid_input("image asset size overflow"))?;
        if data.len() != expected {
            return Err(ReelError::invalid_input(format!(
                "image asset buffer is {} bytes, expected {expected} for {width}x{height} {format:?}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data: Arc::new(data),
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout of [`ImageAsset::data`].
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn to_rgba_image(&self) -> ReelResult<image::RgbaImage> {
        let bad = || ReelError::invalid_input("image asset buffer does not match its dimensions");
        let raw = self.data.as_ref().clone();
        let rgba = match self.format {
            PixelFormat::Rgba8 => image::RgbaImage::from_raw(self.width, self.height, raw)
                .ok_or_else(bad)?,
            PixelFormat::Rgb8 => image::DynamicImage::ImageRgb8(
                image::RgbImage::from_raw(self.width, self.height, raw).ok_or_else(bad)?,
            )
            .to_rgba8(),
            PixelFormat::Luma8 => image::DynamicImage::ImageLuma8(
                image::GrayImage::from_raw(self.width, self.height, raw).ok_or_else(bad)?,
            )
            .to_rgba8(),
        };
        Ok(rgba)
    }
}

/// Decode encoded image bytes (PNG, JPEG, ...) into an RGBA8 [`ImageAsset`].
pub fn decode_image(bytes: &[u8]) -> ReelResult<ImageAsset> {
    if bytes.is_empty() {
        return Err(ReelError::invalid_input("image bytes are empty"));
    }
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| ReelError::invalid_input(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    ImageAsset::new(width, height, PixelFormat::Rgba8, rgba.into_raw())
}

/// Resize and center-crop `asset` so it covers `canvas` exactly.
///
/// The result is opaque: any source alpha is flattened over black.
pub fn normalize_to_canvas(asset: &ImageAsset, canvas: Canvas) -> ReelResult<FrameRGBA> {
    canvas.validate()?;
    if asset.width == 0 || asset.height == 0 {
        return Err(ReelError::invalid_input("cannot normalize a zero-size image"));
    }

    let src = asset.to_rgba_image()?;
    let fitted = if src.dimensions() == (canvas.width, canvas.height) {
        src
    } else {
        let scale = f64::max(
            f64::from(canvas.width) / f64::from(asset.width),
            f64::from(canvas.height) / f64::from(asset.height),
        );
        let sw = ((f64::from(asset.width) * scale).round() as u32).max(canvas.width);
        let sh = ((f64::from(asset.height) * scale).round() as u32).max(canvas.height);
        let resized = image::imageops::resize(&src, sw, sh, FilterType::Triangle);
        let x = (sw - canvas.width) / 2;
        let y = (sh - canvas.height) / 2;
        image::imageops::crop_imm(&resized, x, y, canvas.width, canvas.height).to_image()
    };

    let mut data = fitted.into_raw();
    flatten_alpha_over_black(&mut data);
    FrameRGBA::new(canvas.width, canvas.height, data)
}

fn flatten_alpha_over_black(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a != 255 {
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * a + 127) / 255) as u8;
            }
            px[3] = 255;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/image.rs"]
mod tests;
