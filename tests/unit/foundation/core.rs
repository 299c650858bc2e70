use super::*;

#[test]
fn frame_range_contains_boundaries() {
    let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
    assert!(!r.contains(FrameIndex(1)));
    assert!(r.contains(FrameIndex(2)));
    assert!(r.contains(FrameIndex(4)));
    assert!(!r.contains(FrameIndex(5)));
    assert_eq!(r.len_frames(), 3);
    assert!(FrameRange::new(FrameIndex(5), FrameIndex(2)).is_err());
}

#[test]
fn fps_rounds_seconds_to_nearest_frame() {
    let fps = Fps::new(30, 1).unwrap();
    assert_eq!(fps.secs_to_frames_round(5.5), 165);
    assert_eq!(fps.secs_to_frames_round(0.049), 1);
    assert_eq!(fps.secs_to_frames_round(-1.0), 0);
    assert!((fps.frame_to_secs(FrameIndex(45)) - 1.5).abs() < 1e-12);
}

#[test]
fn fps_rejects_zero() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
}

#[test]
fn canvas_scaled_rounds_to_pixels() {
    let c = Canvas {
        width: 1280,
        height: 720,
    };
    assert_eq!(
        c.scaled(1.2),
        Canvas {
            width: 1536,
            height: 864
        }
    );
    assert_eq!(c.rgba_len(), 1280 * 720 * 4);
}
