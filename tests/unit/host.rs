use super::*;
use crate::ErrorKind;
use crate::config::OutputFormat;
use crate::foundation::core::{Canvas, Fps};

fn png_bytes(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

struct MapHost(Vec<(&'static str, Vec<u8>)>);

impl RenderHost for MapHost {
    fn read(&self, asset: &str) -> ReelResult<Vec<u8>> {
        self.0
            .iter()
            .find(|(k, _)| *k == asset)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| ReelError::invalid_input(format!("unknown asset '{asset}'")))
    }

    fn write(&self, _artifact: &Artifact) -> ReelResult<()> {
        Ok(())
    }
}

#[test]
fn cancel_flag_is_shared_between_clones() {
    let flag = CancelFlag::new();
    let seen = flag.clone();
    assert!(!seen.is_cancelled());
    flag.cancel();
    assert!(seen.is_cancelled());
}

#[test]
fn load_images_keeps_reference_order() {
    let host = MapHost(vec![
        ("b", png_bytes(1, 1, [2, 2, 2, 255])),
        ("a", png_bytes(2, 1, [1, 1, 1, 255])),
    ]);
    let images = load_images(&host, &["a", "b"]).unwrap();
    assert_eq!(images[0].width(), 2);
    assert_eq!(images[1].data()[0], 2);
}

#[test]
fn load_images_names_the_corrupt_asset() {
    let host = MapHost(vec![("bad.png", b"nope".to_vec())]);
    let err = load_images(&host, &["bad.png"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("bad.png"));
}

#[test]
fn fs_host_round_trips_assets_and_artifacts() {
    let dir = std::path::PathBuf::from("target").join("unit_host");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let asset = dir.join("in.png");
    std::fs::write(&asset, png_bytes(1, 1, [0, 0, 0, 255])).unwrap();

    let host = FsHost::new(dir.join("out").join("video.y4m"));
    assert!(!host.read(asset.to_str().unwrap()).unwrap().is_empty());
    assert_eq!(
        host.read("target/unit_host/missing.png").unwrap_err().kind(),
        ErrorKind::InvalidInput
    );

    let artifact = Artifact {
        format: OutputFormat::Y4m,
        canvas: Canvas {
            width: 2,
            height: 2,
        },
        fps: Fps::integer(24).unwrap(),
        frame_count: 0,
        bytes: b"YUV4MPEG2 W2 H2 F24:1 Ip A1:1 C444\n".to_vec(),
    };
    host.write(&artifact).unwrap();
    assert_eq!(std::fs::read(host.out_path()).unwrap(), artifact.bytes);

    let cancel = host.cancel_handle();
    cancel.cancel();
    assert!(host.cancel_flag().unwrap().is_cancelled());
}
