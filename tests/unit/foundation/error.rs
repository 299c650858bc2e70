use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ReelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(ReelError::config("x").to_string().contains("config error:"));
    assert!(ReelError::encode("x").to_string().contains("encode error:"));
    assert!(
        ReelError::ManifestNotFound {
            path: PathBuf::from("tmp/durations.txt")
        }
        .to_string()
        .contains("tmp/durations.txt")
    );
}

#[test]
fn only_entry_level_errors_are_recoverable() {
    assert!(ReelError::missing_asset("a", "images/a.jpg", "not found").is_recoverable());
    assert!(
        ReelError::MalformedManifestLine {
            line: 3,
            content: "garbage".to_string(),
            reason: "no colon".to_string(),
        }
        .is_recoverable()
    );
    assert!(
        !ReelError::ManifestNotFound {
            path: PathBuf::from("x")
        }
        .is_recoverable()
    );
    assert!(!ReelError::encode("disk full").is_recoverable());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn stage_tag_names_the_failing_stage_once() {
    let err = ReelError::encode("ffmpeg exited").at_stage(PipelineStage::Encode);
    assert_eq!(err.stage(), Some(PipelineStage::Encode));
    assert!(err.to_string().starts_with("encode stage failed:"));

    let retagged = err.at_stage(PipelineStage::Sequence);
    assert_eq!(retagged.stage(), Some(PipelineStage::Encode));
    assert_eq!(ReelError::validation("x").stage(), None);
}
