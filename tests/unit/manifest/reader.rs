use super::*;

fn opts() -> ManifestOptions {
    ManifestOptions {
        audio_dir: PathBuf::from("tmp/audio"),
        image_ext: "jpg".to_string(),
    }
}

#[test]
fn parses_entries_in_file_order() {
    let text = "a.mp3: 4.00 seconds\nb.mp3: 3.50 seconds\n";
    let m = DurationManifest::parse(text, &opts()).unwrap();
    assert_eq!(m.len(), 2);

    let a = &m.entries()[0];
    assert_eq!(a.key.as_str(), "a");
    assert_eq!(a.image_name, "a.jpg");
    assert_eq!(a.audio_name, "a.mp3");
    assert_eq!(a.audio_path, PathBuf::from("tmp/audio/a.mp3"));
    assert_eq!(a.duration_sec, 4.0);

    assert_eq!(m.entries()[1].key.as_str(), "b");
    assert!((m.total_duration_sec() - 7.5).abs() < 1e-12);
}

#[test]
fn malformed_lines_are_skipped_not_fatal() {
    let text = "\
# narration durations
a.mp3: 4.00 seconds
this line has no separator
b.mp3 3.0 seconds
c.mp3: soon seconds
d.mp3: -1 seconds
e.mp3: 0 seconds
f.mp3: 1.0: seconds
sub/g.mp3: 2.0 seconds

h.mp3: 2.25
";
    let m = DurationManifest::parse(text, &opts()).unwrap();
    let keys: Vec<_> = m.entries().iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["a", "h"]);
    assert_eq!(m.malformed_lines(), 7);
    assert_eq!(m.entries()[1].duration_sec, 2.25);
}

#[test]
fn duplicate_keys_keep_first_occurrence() {
    let text = "a.mp3: 1.0 seconds\na.mp3: 9.0 seconds\nb.mp3: 2.0 seconds\n";
    let m = DurationManifest::parse(text, &opts()).unwrap();
    assert_eq!(m.len(), 2);
    assert_eq!(m.entries()[0].key.as_str(), "a");
    assert_eq!(m.entries()[0].duration_sec, 1.0);
}

#[test]
fn image_extension_is_configurable() {
    let o = ManifestOptions {
        image_ext: "png".to_string(),
        ..opts()
    };
    let m = DurationManifest::parse("intro.wav: 1.5 seconds", &o).unwrap();
    assert_eq!(m.entries()[0].image_name, "intro.png");
}

#[test]
fn asset_key_rejects_path_like_values() {
    assert!(AssetKey::new("").is_err());
    assert!(AssetKey::new("..").is_err());
    assert!(AssetKey::new("a/b").is_err());
    assert!(AssetKey::new("a\\b").is_err());
    assert!(AssetKey::new("a\nb").is_err());
    assert_eq!(AssetKey::new("end_paragraph_3").unwrap().to_string(), "end_paragraph_3");
}

#[test]
fn missing_manifest_is_manifest_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = DurationManifest::read(&dir.path().join("durations.txt"), &opts()).unwrap_err();
    assert!(matches!(err, ReelError::ManifestNotFound { .. }));
    assert!(!err.is_recoverable());
}

#[test]
fn read_parses_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("durations.txt");
    std::fs::write(&path, "a.mp3: 4.00 seconds\r\nb.mp3: 3.50 seconds\r\n").unwrap();
    let m = DurationManifest::read(&path, &opts()).unwrap();
    assert_eq!(m.len(), 2);
    assert_eq!(m.entries()[1].duration_sec, 3.5);
}
