use super::*;
use crate::ErrorKind;

#[test]
fn defaults_are_valid() {
    let cfg = RenderConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.fps, 24);
    assert_eq!(cfg.format, OutputFormat::Mp4H264);
}

#[test]
fn json_overrides_merge_with_defaults() {
    let cfg = RenderConfig::from_json_str(
        r#"{ "zoom_factor": 1.5, "format": "y4m", "chunk_duration": 4.0,
             "limits": { "max_assets": 3 } }"#,
    )
    .unwrap();
    assert_eq!(cfg.zoom_factor, 1.5);
    assert_eq!(cfg.format, OutputFormat::Y4m);
    assert_eq!(cfg.chunk_duration, Some(4.0));
    assert_eq!(cfg.limits.max_assets, 3);
    assert_eq!(cfg.clip_duration, 2.0);
}

#[test]
fn unknown_fields_are_rejected() {
    let err = RenderConfig::from_json_str(r#"{ "zoom": 1.5 }"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[test]
fn parameter_checks_fail_fast() {
    let bad = |f: fn(&mut RenderConfig)| {
        let mut cfg = RenderConfig::default();
        f(&mut cfg);
        cfg.validate().unwrap_err().kind()
    };
    assert_eq!(bad(|c| c.clip_duration = 0.0), ErrorKind::InvalidParameter);
    assert_eq!(bad(|c| c.zoom_factor = 0.99), ErrorKind::InvalidParameter);
    assert_eq!(bad(|c| c.transition_duration = 1.0), ErrorKind::InvalidParameter);
    assert_eq!(bad(|c| c.fps = 0), ErrorKind::InvalidParameter);
    assert_eq!(bad(|c| c.chunk_duration = Some(0.0)), ErrorKind::InvalidParameter);
    assert_eq!(bad(|c| c.canvas.width = 641), ErrorKind::InvalidParameter);
    assert_eq!(
        bad(|c| {
            c.fade_in = 1.5;
            c.fade_out = 1.0;
        }),
        ErrorKind::InvalidParameter
    );
    assert_eq!(
        bad(|c| c.threading.threads = Some(0)),
        ErrorKind::InvalidParameter
    );
}

#[test]
fn odd_canvas_is_fine_for_y4m() {
    let cfg = RenderConfig {
        format: OutputFormat::Y4m,
        canvas: Canvas {
            width: 641,
            height: 361,
        },
        ..RenderConfig::default()
    };
    cfg.validate().unwrap();
}

#[test]
fn admission_rejects_oversized_requests() {
    let limits = RenderLimits {
        max_assets: 2,
        max_total_duration_secs: 10.0,
        ..RenderLimits::default()
    };
    limits.admit(2, 10.0).unwrap();
    assert_eq!(
        limits.admit(3, 1.0).unwrap_err().kind(),
        ErrorKind::ResourceExhausted
    );
    assert_eq!(
        limits.admit(1, 10.5).unwrap_err().kind(),
        ErrorKind::ResourceExhausted
    );
}

#[test]
fn sequential_threading_uses_one_worker() {
    assert_eq!(RenderThreading::default().workers(), 1);
    let t = RenderThreading {
        parallel: true,
        threads: Some(3),
    };
    assert_eq!(t.workers(), 3);
}
