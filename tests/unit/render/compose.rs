use std::sync::Arc;

use super::*;
use crate::clips::{VisualClip, test_clip};
use crate::foundation::core::Fps;
use crate::motion::FadeEnvelope;
use crate::timeline::TimelineSettings;

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

fn clip(key: &str, duration: f64, fade: f64, rgba: [u8; 4]) -> VisualClip {
    let mut c = test_clip(key, duration, WORKING, rgba);
    c.fade = FadeEnvelope::symmetric(fade).fit(duration).envelope;
    c
}

#[test]
fn over_opacity_0_is_noop() {
    let dst = [10, 20, 30, 255];
    assert_eq!(over(dst, [200, 0, 0, 255], 0.0), dst);
}

#[test]
fn over_opaque_source_replaces_destination() {
    assert_eq!(over(BACKGROUND, [9, 8, 7, 255], 1.0), [9, 8, 7, 255]);
}

#[test]
fn unfaded_clip_fills_the_frame() {
    let tl = Timeline::sequence(
        vec![clip("a", 2.0, 0.0, [255, 255, 255, 255])],
        Vec::new(),
        &settings(),
    )
    .unwrap();
    let frame = render_frame(&tl, FrameIndex(0)).unwrap();
    assert_eq!((frame.width, frame.height), (16, 16));
    assert!(frame.data.chunks_exact(4).all(|p| p == [255, 255, 255, 255]));
}

#[test]
fn first_frame_of_a_fade_in_is_black() {
    let tl = Timeline::sequence(
        vec![clip("a", 4.0, 2.0, [255, 255, 255, 255])],
        Vec::new(),
        &settings(),
    )
    .unwrap();
    let frame = render_frame(&tl, FrameIndex(0)).unwrap();
    assert_eq!(frame.pixel(3, 3), Some(BACKGROUND));

    let mid = render_frame(&tl, FrameIndex(60)).unwrap();
    assert_eq!(mid.pixel(3, 3), Some([255, 255, 255, 255]));
}

#[test]
fn overlapping_clips_cross_dissolve() {
    let tl = Timeline::sequence(
        vec![
            clip("a", 4.0, 2.0, [255, 0, 0, 255]),
            clip("b", 4.0, 2.0, [0, 0, 255, 255]),
        ],
        Vec::new(),
        &settings(),
    )
    .unwrap();
    // t = 3.0: b is half faded in over a, which holds full opacity under it.
    let px = render_frame(&tl, FrameIndex(90)).unwrap().pixel(8, 8).unwrap();
    assert_eq!(px[3], 255);
    assert!(px[0].abs_diff(128) <= 2, "{px:?}");
    assert!(px[2].abs_diff(128) <= 2, "{px:?}");
    assert_eq!(px[1], 0);
}

#[test]
fn dissolve_between_identical_images_keeps_full_brightness() {
    let white = [255, 255, 255, 255];
    let tl = Timeline::sequence(
        vec![clip("a", 4.0, 2.0, white), clip("b", 4.0, 2.0, white)],
        Vec::new(),
        &settings(),
    )
    .unwrap();
    for f in [60, 75, 90, 105] {
        let frame = render_frame(&tl, FrameIndex(f)).unwrap();
        assert_eq!(frame.pixel(8, 8), Some(white), "frame {f}");
    }
    // The last clip still fades to black on its own.
    let tail = render_frame(&tl, FrameIndex(tl.frame_count() - 15)).unwrap();
    let px = tail.pixel(8, 8).unwrap();
    assert!(px[0] < 255 && px[0] > 0, "{px:?}");
}

#[test]
fn unscaled_window_maps_pixels_one_to_one() {
    let mut c = clip("a", 2.0, 0.0, [0, 0, 0, 255]);
    let mut bytes = Vec::with_capacity(WORKING.rgba_len());
    for _y in 0..WORKING.height {
        for x in 0..WORKING.width {
            bytes.extend_from_slice(&[(x * 10) as u8, 0, 0, 255]);
        }
    }
    c.image.rgba8_premul = Arc::new(bytes);

    let tl = Timeline::sequence(vec![c], Vec::new(), &settings()).unwrap();
    let frame = render_frame(&tl, FrameIndex(0)).unwrap();
    // Scale 1 centers a 16x16 window on the 24x24 source: columns 4..20.
    assert_eq!(frame.pixel(0, 0).unwrap()[0], 40);
    assert_eq!(frame.pixel(15, 5).unwrap()[0], 190);
}

#[test]
fn out_of_range_frame_is_rejected() {
    let tl = Timeline::sequence(
        vec![clip("a", 1.0, 0.0, [255, 255, 255, 255])],
        Vec::new(),
        &settings(),
    )
    .unwrap();
    assert!(render_frame(&tl, FrameIndex(30)).is_err());
    assert!(render_frame(&tl, FrameIndex(29)).is_ok());
}

#[test]
fn frame_converts_to_image_buffer() {
    let frame = FrameRGBA::filled(
        Canvas {
            width: 3,
            height: 2,
        },
        [1, 2, 3, 255],
    );
    let img = frame.to_rgba_image().unwrap();
    assert_eq!(img.dimensions(), (3, 2));
    assert_eq!(img.get_pixel(2, 1).0, [1, 2, 3, 255]);
}
