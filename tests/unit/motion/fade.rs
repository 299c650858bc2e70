use super::*;

#[test]
fn opacity_ramps_in_and_out() {
    let env = FadeEnvelope::symmetric(2.0);
    assert_eq!(env.opacity(0.0, 5.0), 0.0);
    assert!((env.opacity(1.0, 5.0) - 0.5).abs() < 1e-6);
    assert_eq!(env.opacity(2.5, 5.0), 1.0);
    assert!((env.opacity(4.0, 5.0) - 0.5).abs() < 1e-6);
    assert_eq!(env.opacity(5.0, 5.0), 0.0);
}

#[test]
fn opacity_is_zero_outside_the_clip() {
    let env = FadeEnvelope::symmetric(0.0);
    assert_eq!(env.opacity(-0.1, 5.0), 0.0);
    assert_eq!(env.opacity(5.1, 5.0), 0.0);
    assert_eq!(env.opacity(2.0, 5.0), 1.0);
    assert_eq!(env.opacity(f64::NAN, 5.0), 0.0);
}

#[test]
fn fit_leaves_valid_envelopes_untouched() {
    let fitted = FadeEnvelope::symmetric(2.0).fit(4.0);
    assert!(!fitted.clamped);
    assert_eq!(fitted.envelope, FadeEnvelope::symmetric(2.0));
}

#[test]
fn fit_clamps_overlapping_ramps_to_half_duration() {
    let fitted = FadeEnvelope::symmetric(2.0).fit(3.0);
    assert!(fitted.clamped);
    assert_eq!(fitted.envelope, FadeEnvelope::symmetric(1.5));

    let fitted = FadeEnvelope {
        fade_in: 3.0,
        fade_out: 0.5,
    }
    .fit(3.0);
    assert!(fitted.clamped);
    assert_eq!(fitted.envelope.fade_in, 1.5);
    assert_eq!(fitted.envelope.fade_out, 0.5);
    assert!(fitted.envelope.fade_in + fitted.envelope.fade_out <= 3.0);
}

#[test]
fn clamped_envelope_peaks_at_midpoint() {
    let env = FadeEnvelope::symmetric(5.0).fit(2.0).envelope;
    assert!((env.opacity(1.0, 2.0) - 1.0).abs() < 1e-6);
    assert!(env.opacity(0.5, 2.0) < 1.0);
}

#[test]
fn fade_in_opacity_ignores_the_tail_ramp() {
    let env = FadeEnvelope::symmetric(2.0);
    assert!((env.fade_in_opacity(1.0, 5.0) - 0.5).abs() < 1e-6);
    assert_eq!(env.fade_in_opacity(4.5, 5.0), 1.0);
    assert_eq!(env.fade_in_opacity(5.0, 5.0), 1.0);
    assert_eq!(env.fade_in_opacity(5.5, 5.0), 0.0);
}
