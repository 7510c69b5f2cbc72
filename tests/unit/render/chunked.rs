use super::*;
use crate::ErrorKind;
use crate::assets::image::{ImageAsset, PixelFormat};
use crate::assets::source::ClipSource;
use crate::composition::clip::ClipSpec;
use crate::config::{OutputFormat, RenderLimits};
use crate::foundation::core::Canvas;
use crate::render::pipeline::FRAMES_IN_FLIGHT_PER_WORKER;

fn four_by_three() -> Timeline {
    let clips = (0..4)
        .map(|i| {
            let img = ImageAsset::new(2, 2, PixelFormat::Luma8, vec![i * 60; 4]).unwrap();
            ClipSpec::new(ClipSource::image(img), 3.0)
        })
        .collect();
    Timeline::new(clips, 1.0).unwrap()
}

fn fps10() -> Fps {
    Fps::integer(10).unwrap()
}

fn bounds(segs: &[RenderSegment]) -> Vec<(u64, u64)> {
    segs.iter()
        .map(|s| (s.frames.start.0, s.frames.end.0))
        .collect()
}

#[test]
fn cut_inside_a_window_moves_to_its_end() {
    let tl = four_by_three();
    let segs = plan_segments(&tl, fps10(), 2.5).unwrap();
    assert_eq!(bounds(&segs), vec![(0, 30), (30, 55), (55, 80), (80, 90)]);
    assert!((segs[0].time.end - 3.0).abs() < 1e-9);
    assert!((segs[3].time.end - tl.total_duration()).abs() < 1e-12);
}

#[test]
fn segments_cover_every_frame_once_and_never_split_a_window() {
    let tl = four_by_three();
    for chunk in [0.05, 0.3, 0.5, 1.0, 1.7, 2.0, 4.4, 100.0] {
        let segs = plan_segments(&tl, fps10(), chunk).unwrap();
        let mut next = 0;
        for (i, s) in segs.iter().enumerate() {
            assert_eq!(s.index, i);
            assert_eq!(s.frames.start.0, next, "gap before segment {i} for chunk {chunk}");
            assert!(!s.frames.is_empty());
            next = s.frames.end.0;
            for w in tl.transition_windows() {
                assert!(
                    !w.strictly_contains(s.time.start),
                    "chunk {chunk}: boundary {} inside {w:?}",
                    s.time.start
                );
            }
        }
        assert_eq!(next, tl.frame_count(fps10()));
    }
}

#[test]
fn chunk_shorter_than_a_window_is_extended_over_it() {
    let tl = four_by_three();
    let segs = plan_segments(&tl, fps10(), 0.5).unwrap();
    for w in tl.transition_windows() {
        assert!(
            segs.iter()
                .any(|s| s.time.start <= w.start && w.end <= s.time.end),
            "no segment contains {w:?}"
        );
    }
    let longest = segs.iter().map(|s| s.time.len_secs()).fold(0.0, f64::max);
    assert!((longest - 1.0).abs() < 1e-9);
}

#[test]
fn invalid_chunk_duration_is_rejected() {
    let tl = four_by_three();
    for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = plan_segments(&tl, fps10(), bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }
}

fn y4m_config(scratch: &str) -> RenderConfig {
    RenderConfig {
        fps: 10,
        canvas: Canvas {
            width: 4,
            height: 4,
        },
        format: OutputFormat::Y4m,
        chunk_duration: Some(2.0),
        scratch_dir: Some(PathBuf::from("target").join("unit_chunked").join(scratch)),
        ..RenderConfig::default()
    }
}

#[test]
fn unchunked_config_plans_one_segment() {
    let tl = four_by_three();
    let config = RenderConfig {
        chunk_duration: None,
        ..y4m_config("one")
    };
    let r = ChunkedRenderer::new(&tl, &config).unwrap();
    assert_eq!(bounds(r.segments()), vec![(0, 90)]);
}

#[test]
fn admission_fails_before_scratch_state_exists() {
    let tl = four_by_three();
    let config = RenderConfig {
        limits: RenderLimits {
            max_assets: 3,
            ..RenderLimits::default()
        },
        ..y4m_config("admission")
    };
    let err = ChunkedRenderer::new(&tl, &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceExhausted);

    let config = RenderConfig {
        limits: RenderLimits {
            max_total_duration_secs: 8.0,
            ..RenderLimits::default()
        },
        ..y4m_config("admission")
    };
    assert_eq!(
        ChunkedRenderer::new(&tl, &config).unwrap_err().kind(),
        ErrorKind::ResourceExhausted
    );

    let config = RenderConfig {
        limits: RenderLimits {
            max_buffered_bytes: 64,
            ..RenderLimits::default()
        },
        ..y4m_config("admission")
    };
    assert_eq!(
        ChunkedRenderer::new(&tl, &config).unwrap_err().kind(),
        ErrorKind::ResourceExhausted
    );
    assert!(!config.scratch_root().exists());
}

#[test]
fn invalid_parameters_fail_before_planning() {
    let tl = four_by_three();
    let config = RenderConfig {
        chunk_duration: Some(0.0),
        ..y4m_config("params")
    };
    assert_eq!(
        ChunkedRenderer::new(&tl, &config).unwrap_err().kind(),
        ErrorKind::InvalidParameter
    );
}

#[test]
fn scratch_guard_removes_its_directory() {
    let root = PathBuf::from("target").join("unit_chunked").join("guard");
    let guard = TempDirGuard::create(&root).unwrap();
    let dir = guard.path().to_path_buf();
    std::fs::write(dir.join("segment_00000.y4m"), b"x").unwrap();
    drop(guard);
    assert!(!dir.exists());
}

#[test]
fn decoded_sources_count_toward_the_memory_budget() {
    // 20 RGBA stills of 500x500 hold 20 MB while the 8x6 canvas buffers stay under 1 KB.
    let clips = (0..20)
        .map(|i| {
            let data = vec![i as u8; 500 * 500 * 4];
            let img = ImageAsset::new(500, 500, PixelFormat::Rgba8, data).unwrap();
            ClipSpec::new(ClipSource::image(img), 2.0)
        })
        .collect();
    let tl = Timeline::new(clips, 0.5).unwrap();
    let canvas = Canvas {
        width: 8,
        height: 6,
    };
    let config = RenderConfig {
        canvas,
        limits: RenderLimits {
            max_buffered_bytes: 1000,
            ..RenderLimits::default()
        },
        ..y4m_config("sources")
    };
    assert!(FRAMES_IN_FLIGHT_PER_WORKER * canvas.frame_bytes() < 1000);
    let err = ChunkedRenderer::new(&tl, &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    assert!(err.to_string().contains("20000000 bytes of decoded sources"), "{err}");
    assert!(!config.scratch_root().exists());
}

#[test]
fn prebuilt_timeline_ignores_clip_fields_of_the_config() {
    let clips = (0..3)
        .map(|i| {
            let img = ImageAsset::new(2, 2, PixelFormat::Luma8, vec![i * 80; 4]).unwrap();
            ClipSpec::new(ClipSource::image(img), 4.0)
        })
        .collect();
    let tl = Timeline::new(clips, 0.1).unwrap();
    let config = RenderConfig {
        clip_duration: 0.5,
        transition_duration: 0.3,
        ..y4m_config("prebuilt")
    };
    assert!(config.validate().is_err());
    let r = ChunkedRenderer::new(&tl, &config).unwrap();
    assert_eq!(r.segments().last().unwrap().frames.end.0, tl.frame_count(fps10()));

    let bad_output = RenderConfig {
        fps: 0,
        ..config.clone()
    };
    assert_eq!(
        ChunkedRenderer::new(&tl, &bad_output).unwrap_err().kind(),
        ErrorKind::InvalidParameter
    );
}

#[test]
fn timeline_without_frames_is_rejected_on_both_paths() {
    let img = ImageAsset::new(2, 2, PixelFormat::Luma8, vec![0; 4]).unwrap();
    let tl = Timeline::new(vec![ClipSpec::new(ClipSource::image(img), 1e-8)], 0.0).unwrap();
    assert_eq!(tl.frame_count(fps10()), 0);
    for chunk in [None, Some(1.0)] {
        let config = RenderConfig {
            chunk_duration: chunk,
            ..y4m_config("empty")
        };
        let err = ChunkedRenderer::new(&tl, &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter, "chunk {chunk:?}");
    }
    assert_eq!(
        plan_segments(&tl, fps10(), 0.5).unwrap_err().kind(),
        ErrorKind::InvalidParameter
    );
}
