use super::*;

#[test]
fn defaults_match_observed_constants() {
    let cfg = ReelConfig::default();
    assert_eq!(cfg.canvas(), Canvas { width: 1280, height: 720 });
    assert_eq!(cfg.fps().unwrap(), Fps::new(30, 1).unwrap());
    assert_eq!(cfg.video.fade_sec, 2.0);
    assert_eq!(cfg.motion.headroom, 1.2);
    assert_eq!(cfg.motion.crop_margin, 50);
    assert_eq!(cfg.encode.codec, "libx264");
    assert_eq!(cfg.encode.bitrate, "5000k");
    assert_eq!(cfg.assets.image_ext, "jpg");
    assert!(cfg.audio.enabled);
    cfg.validate().unwrap();
}

#[test]
fn partial_json_fills_defaults() {
    let cfg: ReelConfig =
        serde_json::from_str(r#"{ "video": { "fade_sec": 0.5 }, "encode": { "bitrate": "2M" } }"#)
            .unwrap();
    assert_eq!(cfg.video.fade_sec, 0.5);
    assert_eq!(cfg.video.width, 1280);
    assert_eq!(cfg.encode.bitrate, "2M");
    assert_eq!(cfg.encode.codec, "libx264");
    cfg.validate().unwrap();
}

#[test]
fn validate_rejects_bad_values() {
    let mut cfg = ReelConfig::default();
    cfg.video.width = 1281;
    assert!(cfg.validate().is_err());

    let mut cfg = ReelConfig::default();
    cfg.video.fade_sec = -1.0;
    assert!(cfg.validate().is_err());

    let mut cfg = ReelConfig::default();
    cfg.motion.headroom = 0.9;
    assert!(cfg.validate().is_err());

    let mut cfg = ReelConfig::default();
    cfg.motion.crop_margin = 360;
    assert!(cfg.validate().is_err());

    let mut cfg = ReelConfig::default();
    cfg.assets.image_ext = ".png".to_string();
    assert!(cfg.validate().is_err());

    let mut cfg = ReelConfig::default();
    cfg.audio.overlay_starts.insert("a".to_string(), -2.0);
    assert!(cfg.validate().is_err());
}

#[test]
fn from_path_reports_parse_errors_as_config_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reel.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = ReelConfig::from_path(&path).unwrap_err();
    assert!(matches!(err, ReelError::Config(_)));
}
