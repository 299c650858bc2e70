//! Clip builder: one still image per manifest entry, with motion and fades attached.

use std::path::{Path, PathBuf};

use rand::SeedableRng as _;
use rand::rngs::StdRng;
use rand::seq::SliceRandom as _;

use crate::assets::decode::{PreparedImage, load_working_image};
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::manifest::{AssetKey, DurationEntry, DurationManifest};
use crate::motion::{FadeEnvelope, Transform, TransformKind, TransformParams};

/// How transforms are assigned to clips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformPolicy {
    /// Every clip gets the same motion.
    Fixed(TransformKind),
    /// Each clip draws independently and uniformly from [`TransformKind::ALL`].
    Random {
        /// Seed for reproducible draws; entropy-seeded when absent.
        seed: Option<u64>,
    },
}

impl Default for TransformPolicy {
    fn default() -> Self {
        Self::Fixed(TransformKind::ZoomIn)
    }
}

enum TransformSelector {
    Fixed(TransformKind),
    Random(StdRng),
}

impl TransformSelector {
    fn new(policy: TransformPolicy) -> Self {
        match policy {
            TransformPolicy::Fixed(kind) => Self::Fixed(kind),
            TransformPolicy::Random { seed: Some(seed) } => {
                Self::Random(StdRng::seed_from_u64(seed))
            }
            TransformPolicy::Random { seed: None } => Self::Random(StdRng::from_entropy()),
        }
    }

    fn next(&mut self) -> TransformKind {
        match self {
            Self::Fixed(kind) => *kind,
            Self::Random(rng) => TransformKind::ALL
                .choose(rng)
                .copied()
                .unwrap_or(TransformKind::ZoomIn),
        }
    }
}

/// One still image on the timeline, before it is placed.
#[derive(Clone, Debug)]
pub struct VisualClip {
    /// Manifest key.
    pub key: AssetKey,
    /// Source image path.
    pub image_path: PathBuf,
    /// Paired narration path.
    pub audio_path: PathBuf,
    /// Working-canvas pixels.
    pub image: PreparedImage,
    /// Clip length in seconds, equal to the manifest duration.
    pub duration_sec: f64,
    /// Pan/zoom motion.
    pub transform: Transform,
    /// Fade envelope, already fitted to `duration_sec`.
    pub fade: FadeEnvelope,
    /// Whether the configured fades had to be shortened for this clip.
    pub fade_clamped: bool,
}

/// Manifest entry that did not produce a clip.
#[derive(Debug)]
pub struct SkippedEntry {
    /// Manifest key.
    pub key: AssetKey,
    /// Why the entry was skipped (always recoverable).
    pub error: ReelError,
}

/// Result of building clips for a whole manifest.
#[derive(Debug, Default)]
pub struct ClipBatch {
    /// Built clips in manifest order.
    pub clips: Vec<VisualClip>,
    /// Entries skipped because of missing or unreadable assets.
    pub skipped: Vec<SkippedEntry>,
}

/// Inputs shared by every clip in a run.
#[derive(Clone, Debug)]
pub struct ClipBuilderOptions {
    /// Directory holding the still images.
    pub images_dir: PathBuf,
    /// Oversized working canvas (output canvas times headroom).
    pub working: Canvas,
    /// Transform parameters.
    pub params: TransformParams,
    /// Transform assignment.
    pub policy: TransformPolicy,
    /// Requested fades, before per-clip fitting.
    pub fade: FadeEnvelope,
}

/// Turns manifest entries into [`VisualClip`]s.
pub struct ClipBuilder {
    opts: ClipBuilderOptions,
    selector: TransformSelector,
}

impl ClipBuilder {
    /// Create a builder. Random policies are seeded here, once per run.
    pub fn new(opts: ClipBuilderOptions) -> Self {
        let selector = TransformSelector::new(opts.policy);
        Self { opts, selector }
    }

    /// Build clips for every entry in manifest order, skipping entries with missing assets.
    #[tracing::instrument(skip_all, fields(entries = manifest.len()))]
    pub fn build_all(&mut self, manifest: &DurationManifest) -> ClipBatch {
        let mut batch = ClipBatch::default();
        for entry in manifest {
            match self.build(entry) {
                Ok(clip) => batch.clips.push(clip),
                Err(error) => {
                    tracing::warn!(key = %entry.key, "skipping entry: {error}");
                    batch.skipped.push(SkippedEntry {
                        key: entry.key.clone(),
                        error,
                    });
                }
            }
        }
        tracing::info!(
            built = batch.clips.len(),
            skipped = batch.skipped.len(),
            "built clips"
        );
        batch
    }

    /// Build one clip. Fails with [`ReelError::MissingAsset`] when the image or audio is
    /// absent or the image cannot be decoded.
    pub fn build(&mut self, entry: &DurationEntry) -> ReelResult<VisualClip> {
        let image_path = self.opts.images_dir.join(&entry.image_name);
        require_file(&entry.key, &image_path, "image")?;
        require_file(&entry.key, &entry.audio_path, "audio")?;

        let image = load_working_image(&image_path, self.opts.working).map_err(|e| {
            ReelError::missing_asset(entry.key.as_str(), &image_path, format!("{e:#}"))
        })?;

        let fitted = self.opts.fade.fit(entry.duration_sec);
        if fitted.clamped {
            tracing::warn!(
                key = %entry.key,
                duration_sec = entry.duration_sec,
                requested_in = self.opts.fade.fade_in,
                requested_out = self.opts.fade.fade_out,
                clamped_to = fitted.envelope.fade_in.max(fitted.envelope.fade_out),
                "fades exceed clip duration; clamping to half the clip"
            );
        }

        let kind = self.selector.next();
        tracing::debug!(key = %entry.key, transform = %kind, "clip ready");

        Ok(VisualClip {
            key: entry.key.clone(),
            image_path,
            audio_path: entry.audio_path.clone(),
            image,
            duration_sec: entry.duration_sec,
            transform: Transform::new(kind, self.opts.params),
            fade: fitted.envelope,
            fade_clamped: fitted.clamped,
        })
    }
}

fn require_file(key: &AssetKey, path: &Path, what: &str) -> ReelResult<()> {
    if path.is_file() {
        return Ok(());
    }
    Err(ReelError::missing_asset(
        key.as_str(),
        path,
        format!("{what} file not found"),
    ))
}

/// Opaque single-color clip for tests elsewhere in the crate.
#[cfg(test)]
pub(crate) fn test_clip(key: &str, duration_sec: f64, working: Canvas, rgba: [u8; 4]) -> VisualClip {
    let px = working.width as usize * working.height as usize;
    let bytes: Vec<u8> = std::iter::repeat_n(rgba, px).flatten().collect();
    VisualClip {
        key: AssetKey::new(key).expect("test key"),
        image_path: PathBuf::from(format!("{key}.jpg")),
        audio_path: PathBuf::from(format!("{key}.mp3")),
        image: PreparedImage {
            width: working.width,
            height: working.height,
            rgba8_premul: std::sync::Arc::new(bytes),
        },
        duration_sec,
        transform: Transform::new(TransformKind::ZoomIn, TransformParams::default()),
        fade: FadeEnvelope::default(),
        fade_clamped: false,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/clips/builder.rs"]
mod tests;
