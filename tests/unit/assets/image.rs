use super::*;

fn png_bytes(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[test]
fn decode_png_to_rgba_asset() {
    let asset = decode_image(&png_bytes(3, 2, [10, 20, 30, 255])).unwrap();
    assert_eq!((asset.width(), asset.height()), (3, 2));
    assert_eq!(asset.format(), PixelFormat::Rgba8);
    assert_eq!(&asset.data()[..4], &[10, 20, 30, 255]);
}

#[test]
fn corrupt_or_empty_bytes_are_invalid_input() {
    let err = decode_image(b"definitely not an image").unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
    let err = decode_image(&[]).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
}

#[test]
fn zero_size_and_short_buffers_are_rejected() {
    assert_eq!(
        ImageAsset::new(0, 4, PixelFormat::Rgb8, vec![])
            .unwrap_err()
            .kind(),
        crate::ErrorKind::InvalidInput
    );
    assert!(ImageAsset::new(2, 2, PixelFormat::Rgb8, vec![0; 11]).is_err());
    assert!(ImageAsset::new(2, 2, PixelFormat::Rgb8, vec![0; 12]).is_ok());
}

#[test]
fn normalize_same_size_is_identity_for_opaque_pixels() {
    let data: Vec<u8> = (0..16u8).map(|i| if i % 4 == 3 { 255 } else { i * 10 }).collect();
    let asset = ImageAsset::new(2, 2, PixelFormat::Rgba8, data.clone()).unwrap();
    let frame = normalize_to_canvas(
        &asset,
        Canvas {
            width: 2,
            height: 2,
        },
    )
    .unwrap();
    assert_eq!(frame.data, data);
}

#[test]
fn normalize_covers_canvas_from_other_aspect_ratio() {
    let asset = ImageAsset::new(8, 2, PixelFormat::Luma8, vec![200; 16]).unwrap();
    let canvas = Canvas {
        width: 4,
        height: 4,
    };
    let frame = normalize_to_canvas(&asset, canvas).unwrap();
    assert_eq!(frame.canvas(), canvas);
    assert_eq!(frame.pixel(1, 1), [200, 200, 200, 255]);
}

#[test]
fn normalize_flattens_alpha_over_black() {
    let asset = ImageAsset::new(1, 1, PixelFormat::Rgba8, vec![255, 255, 255, 0]).unwrap();
    let frame = normalize_to_canvas(
        &asset,
        Canvas {
            width: 1,
            height: 1,
        },
    )
    .unwrap();
    assert_eq!(frame.data, vec![0, 0, 0, 255]);
}
