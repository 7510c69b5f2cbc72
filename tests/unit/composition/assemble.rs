use super::*;
use crate::assets::image::PixelFormat;
use crate::assets::video::FrameSequenceSource;
use crate::foundation::core::Fps;

fn gray(v: u8) -> ImageAsset {
    ImageAsset::new(2, 2, PixelFormat::Luma8, vec![v; 4]).unwrap()
}

fn video(secs: u64, fps: u32) -> Arc<dyn VideoSource> {
    let fps = Fps::integer(fps).unwrap();
    let frames = (0..secs * u64::from(fps.num))
        .map(|i| gray((i % 255) as u8))
        .collect();
    Arc::new(FrameSequenceSource::new(fps, frames).unwrap())
}

#[test]
fn images_become_clips_in_submission_order() {
    let cfg = RenderConfig {
        clip_duration: 3.0,
        zoom_factor: 1.3,
        fade_in: 0.25,
        fade_out: 0.5,
        ..RenderConfig::default()
    };
    let clips = clips_from_images(vec![gray(10), gray(20), gray(30)], &cfg);
    assert_eq!(clips.len(), 3);
    for (clip, expected) in clips.iter().zip([10u8, 20, 30]) {
        let ClipSource::Image(img) = &clip.source else {
            panic!("expected image source");
        };
        assert_eq!(img.data()[0], expected);
        assert_eq!(clip.duration, 3.0);
        assert_eq!(clip.zoom_factor, 1.3);
        assert_eq!((clip.fade_in, clip.fade_out), (0.25, 0.5));
    }
}

#[test]
fn video_is_cut_into_consecutive_segments() {
    let cfg = RenderConfig {
        clip_duration: 2.0,
        transition_duration: 0.5,
        ..RenderConfig::default()
    };
    let clips = split_video(video(7, 10), &cfg).unwrap();
    let durations: Vec<f64> = clips.iter().map(|c| c.duration).collect();
    // The 1s tail cannot carry a 0.5s crossfade, so it joins the third clip.
    assert_eq!(durations.len(), 3);
    assert!((durations[2] - 3.0).abs() < 1e-9);
    let starts: Vec<f64> = clips
        .iter()
        .map(|c| match &c.source {
            ClipSource::Video { start_secs, .. } => *start_secs,
            ClipSource::Image(_) => panic!("expected video source"),
        })
        .collect();
    assert_eq!(starts, vec![0.0, 2.0, 4.0]);
}

#[test]
fn short_video_tail_is_folded_into_previous_clip() {
    let cfg = RenderConfig {
        clip_duration: 2.0,
        transition_duration: 0.5,
        ..RenderConfig::default()
    };
    // 6.8s: a 0.8s tail cannot carry a 0.5s crossfade.
    let fps = Fps::integer(10).unwrap();
    let frames = (0..68).map(|_| gray(0)).collect();
    let src: Arc<dyn VideoSource> = Arc::new(FrameSequenceSource::new(fps, frames).unwrap());
    let clips = split_video(src, &cfg).unwrap();
    assert_eq!(clips.len(), 3);
    assert!((clips[2].duration - 2.8).abs() < 1e-9);

    let tl = build_timeline(RenderInput::Video(video(7, 10)), &cfg).unwrap();
    assert!((tl.total_duration() - (7.0 - 2.0 * 0.5)).abs() < 1e-9);
}

#[test]
fn clip_count_matches_assembly() {
    let cfg = RenderConfig::default();
    let input = RenderInput::Video(video(9, 5));
    assert_eq!(input.clip_count(&cfg), 4);
    assert_eq!(
        RenderInput::Images(vec![gray(0), gray(1)]).clip_count(&cfg),
        2
    );
}
