use super::*;
use crate::audio::binder::{AudioBinder, AudioMode, OverlaySchedule};
use crate::clips::test_clip;
use crate::motion::FadeEnvelope;

const WORKING: Canvas = Canvas {
    width: 24,
    height: 24,
};

fn settings() -> TimelineSettings {
    TimelineSettings {
        fps: Fps::new(30, 1).unwrap(),
        canvas: Canvas {
            width: 20,
            height: 20,
        },
        crop_margin: 2,
        overlap_sec: 2.0,
    }
}

fn faded(key: &str, duration: f64, fade: f64) -> VisualClip {
    let mut clip = test_clip(key, duration, WORKING, [255, 255, 255, 255]);
    let fitted = FadeEnvelope::symmetric(fade).fit(duration);
    clip.fade = fitted.envelope;
    clip.fade_clamped = fitted.clamped;
    clip
}

fn sequential(clips: &[VisualClip]) -> Vec<AudioPlacement> {
    AudioBinder::new(AudioMode::Sequential, OverlaySchedule::default()).place(clips)
}

#[test]
fn two_clips_overlap_by_the_fade() {
    let clips = vec![faded("a", 4.0, 2.0), faded("b", 3.5, 2.0)];
    let audio = sequential(&clips);
    let tl = Timeline::sequence(clips, audio, &settings()).unwrap();

    assert_eq!(tl.entries()[0].video_start_sec, 0.0);
    assert_eq!(tl.entries()[1].video_start_sec, 2.0);
    assert!((tl.video_duration_sec() - 5.5).abs() < 1e-9);
    assert!((tl.audio_duration_sec() - 7.5).abs() < 1e-9);
    assert_eq!(tl.frame_count(), 165);
    assert_eq!(
        tl.frame_size(),
        Canvas {
            width: 16,
            height: 16
        }
    );
}

#[test]
fn video_duration_is_sum_minus_overlaps() {
    let durations = [5.0, 6.0, 4.5, 7.25];
    let clips: Vec<_> = durations
        .iter()
        .enumerate()
        .map(|(i, d)| faded(&format!("c{i}"), *d, 2.0))
        .collect();
    let tl = Timeline::sequence(clips, Vec::new(), &settings()).unwrap();
    let expected: f64 = durations.iter().sum::<f64>() - 3.0 * 2.0;
    assert!((tl.video_duration_sec() - expected).abs() < 1e-9);
    assert_eq!(tl.audio_duration_sec(), 0.0);
}

#[test]
fn single_clip_keeps_its_duration() {
    let tl = Timeline::sequence(vec![faded("a", 3.0, 1.0)], Vec::new(), &settings()).unwrap();
    assert_eq!(tl.video_duration_sec(), 3.0);
    assert_eq!(tl.frame_count(), 90);
}

#[test]
fn empty_timeline_is_rejected() {
    let err = Timeline::sequence(Vec::new(), Vec::new(), &settings()).unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}

#[test]
fn clamped_envelopes_keep_the_fade_overlap() {
    let clips = vec![faded("a", 3.0, 2.0), faded("b", 5.0, 2.0)];
    assert!(clips[0].fade_clamped);
    let tl = Timeline::sequence(clips, Vec::new(), &settings()).unwrap();
    assert!((tl.entries()[1].video_start_sec - 1.0).abs() < 1e-9);
    assert!((tl.video_duration_sec() - 6.0).abs() < 1e-9);
}

#[test]
fn overlap_never_exceeds_a_clip() {
    let clips = vec![faded("a", 1.5, 2.0), faded("b", 5.0, 2.0)];
    let tl = Timeline::sequence(clips, Vec::new(), &settings()).unwrap();
    assert_eq!(tl.entries()[1].video_start_sec, 0.0);
    assert_eq!(tl.video_duration_sec(), 5.0);
}

#[test]
fn negative_overlap_is_rejected() {
    let mut s = settings();
    s.overlap_sec = -1.0;
    assert!(Timeline::sequence(vec![faded("a", 1.0, 0.0)], Vec::new(), &s).is_err());
}

#[test]
fn skipping_an_entry_recomputes_offsets_without_changing_durations() {
    let all = vec![
        faded("a", 4.0, 2.0),
        faded("b", 3.0, 2.0),
        faded("c", 5.0, 2.0),
    ];
    let survivors = vec![all[0].clone(), all[2].clone()];
    let audio = sequential(&survivors);
    let tl = Timeline::sequence(survivors, audio, &settings()).unwrap();

    let durations: Vec<f64> = tl.entries().iter().map(|e| e.clip.duration_sec).collect();
    assert_eq!(durations, [4.0, 5.0]);
    assert_eq!(tl.entries()[1].video_start_sec, 2.0);
    assert_eq!(tl.entries()[1].audio.as_ref().unwrap().start_sec, 4.0);
    assert!((tl.video_duration_sec() - 7.0).abs() < 1e-9);
}

#[test]
fn active_entries_follow_half_open_intervals() {
    let clips = vec![faded("a", 4.0, 2.0), faded("b", 3.5, 2.0)];
    let tl = Timeline::sequence(clips, Vec::new(), &settings()).unwrap();

    let keys = |t: f64| -> Vec<String> { tl.active_at(t).map(|(e, _)| e.clip.key.to_string()).collect() };
    assert_eq!(keys(0.0), ["a"]);
    assert_eq!(keys(3.0), ["a", "b"]);
    assert_eq!(keys(4.0), ["b"]);
    assert!(keys(5.5).is_empty());

    let (_, elapsed) = tl.active_at(3.0).nth(1).unwrap();
    assert!((elapsed - 1.0).abs() < 1e-9);
}

#[test]
fn mismatched_audio_placements_are_rejected() {
    let clips = vec![faded("a", 4.0, 0.0), faded("b", 3.0, 0.0)];
    let audio = sequential(&clips[..1]);
    assert!(Timeline::sequence(clips, audio, &settings()).is_err());
}

#[test]
fn margin_larger_than_canvas_is_rejected() {
    let mut s = settings();
    s.crop_margin = 10;
    assert!(s.frame_size().is_err());
}

#[test]
fn plan_serializes_clip_rows() {
    let clips = vec![faded("a", 4.0, 2.0), faded("b", 3.5, 2.0)];
    let audio = sequential(&clips);
    let tl = Timeline::sequence(clips, audio, &settings()).unwrap();
    let json = serde_json::to_value(tl.plan()).unwrap();

    assert_eq!(json["frame_count"], 165);
    assert_eq!(json["clips"][1]["key"], "b");
    assert_eq!(json["clips"][1]["video_start_sec"], 2.0);
    assert_eq!(json["clips"][1]["audio_start_sec"], 4.0);
    assert_eq!(json["clips"][0]["transform"], "zoom_in");
}
