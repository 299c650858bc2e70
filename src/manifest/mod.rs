//! Duration manifest reader.
//!
//! The manifest is a plain text ledger written by the narration generator, one segment per
//! line:
//!
//! ```text
//! beginning_paragraph_1.mp3: 4.21 seconds
//! beginning_paragraph_2.mp3: 3.87 seconds
//! ```
//!
//! Each entry keys one still image (the audio filename with its extension swapped for the
//! image extension) and carries the narration length that drives that clip's duration.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{ReelError, ReelResult};

/// Validated asset identifier: the audio file stem shared by a segment's audio and image.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct AssetKey(String);

impl AssetKey {
    /// Validate a stem. Empty stems, path components and control characters are rejected.
    pub fn new(stem: impl Into<String>) -> ReelResult<Self> {
        let stem = stem.into();
        if stem.trim().is_empty() {
            return Err(ReelError::validation("asset key must be non-empty"));
        }
        if stem == "." || stem == ".." {
            return Err(ReelError::validation(format!(
                "asset key '{stem}' is not a file name"
            )));
        }
        if stem.contains(['/', '\\']) || stem.chars().any(char::is_control) {
            return Err(ReelError::validation(format!(
                "asset key '{}' must be a bare file name",
                stem.escape_debug()
            )));
        }
        Ok(Self(stem))
    }

    /// Key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the paired still image.
    pub fn image_name(&self, image_ext: &str) -> String {
        format!("{}.{}", self.0, image_ext)
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where manifest entries resolve their files.
#[derive(Clone, Debug)]
pub struct ManifestOptions {
    /// Directory holding the narration audio files.
    pub audio_dir: PathBuf,
    /// Extension of the paired still image (without the dot).
    pub image_ext: String,
}

/// One narration segment and the clip it drives.
#[derive(Clone, Debug, PartialEq)]
pub struct DurationEntry {
    /// Unique key across the manifest.
    pub key: AssetKey,
    /// Audio file name exactly as written in the manifest.
    pub audio_name: String,
    /// Derived still image file name.
    pub image_name: String,
    /// Narration length in seconds (> 0).
    pub duration_sec: f64,
    /// Resolved audio path.
    pub audio_path: PathBuf,
}

/// Ordered, de-duplicated manifest entries in file order.
#[derive(Clone, Debug, Default)]
pub struct DurationManifest {
    entries: Vec<DurationEntry>,
    malformed_lines: usize,
}

impl DurationManifest {
    /// Read and parse a manifest file.
    ///
    /// Fails with [`ReelError::ManifestNotFound`] when the file does not exist. Malformed
    /// lines are skipped.
    #[tracing::instrument(skip(opts), fields(path = %path.display()))]
    pub fn read(path: &Path, opts: &ManifestOptions) -> ReelResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReelError::ManifestNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("read manifest '{}'", path.display()))
                    .into());
            }
        };
        let manifest = Self::parse(&text, opts)?;
        tracing::info!(
            entries = manifest.len(),
            malformed = manifest.malformed_lines,
            total_sec = manifest.total_duration_sec(),
            "read duration manifest"
        );
        Ok(manifest)
    }

    /// Parse manifest text.
    pub fn parse(text: &str, opts: &ManifestOptions) -> ReelResult<Self> {
        if opts.image_ext.is_empty() {
            return Err(ReelError::validation("image extension must be non-empty"));
        }

        let mut out = Self::default();
        let mut seen = HashSet::<AssetKey>::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_line(idx + 1, line, opts) {
                Ok(entry) => {
                    if !seen.insert(entry.key.clone()) {
                        tracing::warn!(
                            key = %entry.key,
                            line = idx + 1,
                            "duplicate manifest key; keeping the first occurrence"
                        );
                        continue;
                    }
                    out.entries.push(entry);
                }
                Err(e) => {
                    tracing::debug!("{e}");
                    out.malformed_lines += 1;
                }
            }
        }
        Ok(out)
    }

    /// Entries in manifest order.
    pub fn entries(&self) -> &[DurationEntry] {
        &self.entries
    }

    /// Number of valid entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no valid entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lines that were skipped as malformed.
    pub fn malformed_lines(&self) -> usize {
        self.malformed_lines
    }

    /// Sum of all entry durations.
    pub fn total_duration_sec(&self) -> f64 {
        self.entries.iter().map(|e| e.duration_sec).sum()
    }
}

impl<'a> IntoIterator for &'a DurationManifest {
    type Item = &'a DurationEntry;
    type IntoIter = std::slice::Iter<'a, DurationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn parse_line(line_no: usize, line: &str, opts: &ManifestOptions) -> ReelResult<DurationEntry> {
    let malformed = |reason: String| ReelError::MalformedManifestLine {
        line: line_no,
        content: line.to_string(),
        reason,
    };

    let mut fields = line.split(':');
    let (Some(name), Some(value), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(malformed(
            "expected '<audio-file>: <duration> seconds'".to_string(),
        ));
    };

    let audio_name = name.trim();
    let value = value.trim();
    let value = value
        .strip_suffix("seconds")
        .or_else(|| value.strip_suffix("second"))
        .unwrap_or(value)
        .trim();
    let duration_sec: f64 = value
        .parse()
        .map_err(|_| malformed(format!("'{value}' is not a number")))?;
    if !duration_sec.is_finite() || duration_sec <= 0.0 {
        return Err(malformed(format!(
            "duration must be positive, got {duration_sec}"
        )));
    }

    let stem = Path::new(audio_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .context("audio file name has no stem")
        .map_err(|e| malformed(e.to_string()))?;
    if Path::new(audio_name).file_name().and_then(|s| s.to_str()) != Some(audio_name) {
        return Err(malformed(format!(
            "'{audio_name}' must be a bare file name"
        )));
    }
    let key = AssetKey::new(stem).map_err(|e| malformed(e.to_string()))?;

    Ok(DurationEntry {
        image_name: key.image_name(&opts.image_ext),
        audio_path: opts.audio_dir.join(audio_name),
        audio_name: audio_name.to_string(),
        duration_sec,
        key,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/manifest/reader.rs"]
mod tests;
