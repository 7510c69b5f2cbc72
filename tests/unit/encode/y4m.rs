use super::*;
use crate::config::OutputFormat;
use crate::foundation::core::{Canvas, Fps};

fn settings(w: u32, h: u32) -> EncodeSettings {
    EncodeSettings {
        canvas: Canvas {
            width: w,
            height: h,
        },
        fps: Fps::integer(25).unwrap(),
        format: OutputFormat::Y4m,
    }
}

#[test]
fn header_names_size_rate_and_colorspace() {
    assert_eq!(
        header_line(&settings(4, 2)),
        "YUV4MPEG2 W4 H2 F25:1 Ip A1:1 C444\n"
    );
}

#[test]
fn black_and_white_map_to_limited_range() {
    let mut planes = vec![0u8; 6];
    rgba_to_yuv444_planes(&[0, 0, 0, 255, 255, 255, 255, 255], &mut planes);
    assert_eq!(planes, vec![16, 235, 128, 128, 128, 128]);
}

#[test]
fn writes_header_then_marked_frames() {
    let dir = PathBuf::from("target").join("unit_y4m");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("two_frames.y4m");

    let mut sink = Y4mSink::new(&path);
    sink.begin(settings(2, 1)).unwrap();
    let frame = FrameRGBA::new(2, 1, vec![0, 0, 0, 255, 255, 255, 255, 255]).unwrap();
    sink.push_frame(FrameIndex(0), &frame).unwrap();
    sink.push_frame(FrameIndex(1), &frame).unwrap();
    sink.end().unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let header = header_line(&settings(2, 1));
    assert!(bytes.starts_with(header.as_bytes()));
    assert_eq!(bytes.len(), header.len() + 2 * (FRAME_MARKER.len() + 6));
}

#[test]
fn rejects_out_of_order_and_mis_sized_frames() {
    let dir = PathBuf::from("target").join("unit_y4m");
    std::fs::create_dir_all(&dir).unwrap();
    let mut sink = Y4mSink::new(dir.join("bad.y4m"));
    sink.begin(settings(2, 1)).unwrap();
    let frame = FrameRGBA::new(2, 1, vec![0; 8]).unwrap();
    sink.push_frame(FrameIndex(3), &frame).unwrap();
    assert!(sink.push_frame(FrameIndex(3), &frame).is_err());
    let wrong = FrameRGBA::new(1, 1, vec![0; 4]).unwrap();
    assert!(sink.push_frame(FrameIndex(4), &wrong).is_err());
}

#[test]
fn header_reader_rejects_foreign_streams() {
    let mut r = std::io::Cursor::new(b"RIFF....".to_vec());
    assert!(read_header_line(&mut r, Path::new("x")).is_err());
    let mut r = std::io::Cursor::new(b"YUV4MPEG2 W2 H1 F25:1 Ip A1:1 C444\nFRAME\n".to_vec());
    let line = read_header_line(&mut r, Path::new("x")).unwrap();
    assert!(line.ends_with(b"C444\n"));
}

#[test]
#[cfg(target_pointer_width = "64")]
fn plane_size_does_not_wrap_for_huge_canvases() {
    let canvas = Canvas {
        width: 40_000,
        height: 40_000,
    };
    assert_eq!(yuv444_frame_bytes(canvas) as u64, 40_000u64 * 40_000 * 3);
    assert_eq!(
        yuv444_frame_bytes(Canvas {
            width: 4,
            height: 2
        }),
        24
    );
}
