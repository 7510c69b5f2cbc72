use super::*;
use crate::ErrorKind;
use crate::assets::image::{ImageAsset, PixelFormat};
use crate::assets::source::ClipSource;

fn still(v: u8) -> ClipSource {
    ClipSource::image(ImageAsset::new(2, 2, PixelFormat::Luma8, vec![v; 4]).unwrap())
}

fn clips(durations: &[f64]) -> Vec<ClipSpec> {
    durations
        .iter()
        .enumerate()
        .map(|(i, &d)| ClipSpec::new(still(i as u8), d))
        .collect()
}

#[test]
fn four_three_second_clips_with_one_second_transitions_last_nine_seconds() {
    let tl = Timeline::new(clips(&[3.0, 3.0, 3.0, 3.0]), 1.0).unwrap();
    assert!((tl.total_duration() - 9.0).abs() < 1e-9);
    assert_eq!(tl.transition_windows().len(), 3);
}

#[test]
fn total_is_sum_minus_overlaps_for_uneven_clips() {
    let tl = Timeline::new(clips(&[2.0, 5.0, 1.5]), 0.5).unwrap();
    assert!((tl.total_duration() - (8.5 - 2.0 * 0.5)).abs() < 1e-9);
}

#[test]
fn single_clip_has_no_transition() {
    let tl = Timeline::new(clips(&[2.0]), 5.0).unwrap();
    assert!((tl.total_duration() - 2.0).abs() < 1e-9);
    assert!(tl.transition_windows().is_empty());
    assert_eq!(
        tl.locate(1.999).unwrap(),
        Located::Single(ClipTime {
            clip: 0,
            local_secs: 1.999
        })
    );
}

#[test]
fn oversized_transition_is_invalid_parameter() {
    let err = Timeline::new(clips(&[3.0, 2.0]), 1.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    let err = Timeline::new(clips(&[3.0, 3.0]), 1.5).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert!(Timeline::new(clips(&[3.0, 3.0]), 1.49).is_ok());
}

#[test]
fn empty_and_invalid_clips_are_rejected() {
    assert_eq!(
        Timeline::new(vec![], 0.0).unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    let err = Timeline::new(clips(&[2.0, 0.0]), 0.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert!(err.to_string().contains("clip 1"));

    let mut bad_zoom = clips(&[2.0]);
    bad_zoom[0].zoom_factor = 0.9;
    assert!(Timeline::new(bad_zoom, 0.0).is_err());

    let mut bad_fades = clips(&[2.0]);
    bad_fades[0].fade_in = 1.5;
    bad_fades[0].fade_out = 1.0;
    assert!(Timeline::new(bad_fades, 0.0).is_err());
}

#[test]
fn locate_inside_transition_returns_both_clips_aligned() {
    let tl = Timeline::new(clips(&[3.0, 3.0, 3.0, 3.0]), 1.0).unwrap();
    match tl.locate(2.5).unwrap() {
        Located::Transition {
            outgoing,
            incoming,
            alpha,
        } => {
            assert_eq!(outgoing.clip, 0);
            assert_eq!(incoming.clip, 1);
            assert!((outgoing.local_secs - 2.5).abs() < 1e-9);
            assert!((incoming.local_secs - 0.5).abs() < 1e-9);
            assert!((alpha - 0.5).abs() < 1e-9);
        }
        other => panic!("expected transition, got {other:?}"),
    }
    match tl.locate(2.0).unwrap() {
        Located::Transition { alpha, .. } => assert_eq!(alpha, 0.0),
        other => panic!("expected transition at window start, got {other:?}"),
    }
    assert_eq!(
        tl.locate(3.0).unwrap(),
        Located::Single(ClipTime {
            clip: 1,
            local_secs: 1.0
        })
    );
}

#[test]
fn locate_rejects_out_of_range_times() {
    let tl = Timeline::new(clips(&[3.0, 3.0]), 1.0).unwrap();
    assert!(tl.locate(-0.1).is_err());
    assert!(tl.locate(5.0).is_err());
    assert!(tl.locate(f64::NAN).is_err());
}

#[test]
fn locate_covers_the_whole_timeline_without_gaps() {
    let tl = Timeline::new(clips(&[2.0, 3.5, 1.25, 4.0]), 0.5).unwrap();
    let windows = tl.transition_windows();
    let steps = 4000;
    let mut prev_clip = 0usize;
    for k in 0..steps {
        let t = tl.total_duration() * (k as f64) / (steps as f64);
        let in_window = windows.iter().any(|w| w.contains(t));
        match tl.locate(t).unwrap() {
            Located::Single(ct) => {
                assert!(!in_window, "single clip reported inside a window at {t}");
                let range = tl.clip_range(ct.clip).unwrap();
                assert!(range.contains(t));
                assert!(ct.clip >= prev_clip, "clip order regressed at {t}");
                prev_clip = ct.clip;
            }
            Located::Transition {
                outgoing,
                incoming,
                alpha,
            } => {
                assert!(in_window, "transition reported outside windows at {t}");
                assert_eq!(incoming.clip, outgoing.clip + 1);
                assert!((0.0..=1.0).contains(&alpha));
                assert!(outgoing.local_secs < tl.clips()[outgoing.clip].duration);
                assert!(incoming.local_secs >= 0.0);
                prev_clip = outgoing.clip;
            }
        }
    }
}

#[test]
fn zero_transition_is_a_plain_sequence() {
    let tl = Timeline::new(clips(&[1.0, 1.0]), 0.0).unwrap();
    assert!(tl.transition_windows().is_empty());
    assert_eq!(
        tl.locate(1.0).unwrap(),
        Located::Single(ClipTime {
            clip: 1,
            local_secs: 0.0
        })
    );
    assert_eq!(tl.frame_count(Fps::integer(10).unwrap()), 20);
}
