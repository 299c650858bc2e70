use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::assets::media::{self, AudioPcm};
use crate::clips::{SkippedEntry, VisualClip};
use crate::foundation::error::{ReelError, ReelResult};
use crate::manifest::AssetKey;

/// How narration segments are placed on the audio timeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioMode {
    /// Back to back: each segment starts where the previous declared duration ends.
    #[default]
    Sequential,
    /// Explicit per-key starts from an [`OverlaySchedule`]; overlapping segments are summed.
    Overlay,
}

/// Explicit audio start offsets, in seconds, keyed by asset key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlaySchedule {
    starts: BTreeMap<String, f64>,
}

impl OverlaySchedule {
    /// Build a schedule, rejecting negative or non-finite starts.
    pub fn new(starts: BTreeMap<String, f64>) -> ReelResult<Self> {
        if let Some((key, start)) = starts
            .iter()
            .find(|(_, s)| !s.is_finite() || **s < 0.0)
        {
            return Err(ReelError::validation(format!(
                "overlay start for '{key}' must be finite and >= 0, got {start}"
            )));
        }
        Ok(Self { starts })
    }

    /// Start for `key`, if one was scheduled.
    pub fn start_for(&self, key: &AssetKey) -> Option<f64> {
        self.starts.get(key.as_str()).copied()
    }

    /// Number of scheduled keys.
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Source of decoded narration PCM.
pub trait PcmLoader {
    /// Load the file at `path`.
    fn load(&self, path: &Path) -> ReelResult<AudioPcm>;
}

/// Decodes narration through the system `ffmpeg` into stereo `f32` at a fixed rate.
#[derive(Clone, Copy, Debug)]
pub struct FfmpegPcmLoader {
    /// Target sample rate.
    pub sample_rate: u32,
}

impl Default for FfmpegPcmLoader {
    fn default() -> Self {
        Self {
            sample_rate: media::MIX_SAMPLE_RATE,
        }
    }
}

impl PcmLoader for FfmpegPcmLoader {
    fn load(&self, path: &Path) -> ReelResult<AudioPcm> {
        media::decode_audio_f32_stereo(path, self.sample_rate)
    }
}

/// Where one clip's narration sits on the audio timeline, before any PCM is loaded.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct AudioPlacement {
    /// Manifest key.
    pub key: AssetKey,
    /// Timeline start in seconds.
    pub start_sec: f64,
    /// Declared narration length in seconds.
    pub duration_sec: f64,
}

impl AudioPlacement {
    /// Timeline end in seconds.
    pub fn end_sec(&self) -> f64 {
        self.start_sec + self.duration_sec
    }
}

/// A placed narration segment with its decoded PCM.
#[derive(Clone, Debug)]
pub struct AudioSegment {
    /// Manifest key.
    pub key: AssetKey,
    /// Timeline start in seconds.
    pub start_sec: f64,
    /// Timeline start in bus sample frames.
    pub start_sample: u64,
    /// Length in bus sample frames; longer PCM is truncated, shorter is padded with silence.
    pub len_samples: u64,
    /// Linear gain.
    pub volume: f32,
    /// Decoded source PCM.
    pub pcm: Arc<AudioPcm>,
}

impl AudioSegment {
    /// Exclusive end in bus sample frames.
    pub fn end_sample(&self) -> u64 {
        self.start_sample.saturating_add(self.len_samples)
    }
}

/// Clips whose narration loaded, with their placements and segments in clip order.
#[derive(Debug)]
pub struct BoundAudio {
    /// Clips that kept their narration.
    pub clips: Vec<VisualClip>,
    /// One placement per kept clip.
    pub placements: Vec<AudioPlacement>,
    /// One segment per kept clip.
    pub segments: Vec<AudioSegment>,
    /// Clips dropped because their narration could not be loaded.
    pub skipped: Vec<SkippedEntry>,
}

/// Places each clip's narration on the audio timeline.
#[derive(Clone, Debug)]
pub struct AudioBinder {
    mode: AudioMode,
    schedule: OverlaySchedule,
    sample_rate: u32,
}

impl AudioBinder {
    /// Binder mixing at [`media::MIX_SAMPLE_RATE`].
    pub fn new(mode: AudioMode, schedule: OverlaySchedule) -> Self {
        Self {
            mode,
            schedule,
            sample_rate: media::MIX_SAMPLE_RATE,
        }
    }

    /// Override the bus sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Active mode.
    pub fn mode(&self) -> AudioMode {
        self.mode
    }

    /// Bus sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Compute start offsets for `clips` without touching any audio file.
    ///
    /// Sequential offsets are cumulative over the clips passed in, so entries skipped earlier
    /// leave no gap. In overlay mode keys missing from the schedule use that same offset.
    pub fn place(&self, clips: &[VisualClip]) -> Vec<AudioPlacement> {
        let mut cursor = 0.0f64;
        let mut out = Vec::with_capacity(clips.len());
        for clip in clips {
            let start_sec = match self.mode {
                AudioMode::Sequential => cursor,
                AudioMode::Overlay => self.schedule.start_for(&clip.key).unwrap_or(cursor),
            };
            out.push(AudioPlacement {
                key: clip.key.clone(),
                start_sec,
                duration_sec: clip.duration_sec,
            });
            cursor += clip.duration_sec;
        }
        out
    }

    /// Load narration for every clip, then place the clips whose audio decoded.
    ///
    /// A clip whose narration fails to load is dropped and reported as a
    /// [`ReelError::MissingAsset`]; offsets are computed over the clips that remain.
    #[tracing::instrument(skip_all, fields(clips = clips.len(), mode = ?self.mode))]
    pub fn bind(
        &self,
        clips: Vec<VisualClip>,
        loader: &dyn PcmLoader,
    ) -> ReelResult<BoundAudio> {
        if self.sample_rate == 0 {
            return Err(ReelError::validation("audio bus sample_rate must be > 0"));
        }
        let mut kept = Vec::with_capacity(clips.len());
        let mut pcms = Vec::with_capacity(clips.len());
        let mut skipped = Vec::new();
        for clip in clips {
            match loader.load(&clip.audio_path) {
                Ok(pcm) => {
                    pcms.push(pcm);
                    kept.push(clip);
                }
                Err(e) => {
                    let error = ReelError::missing_asset(
                        clip.key.as_str(),
                        &clip.audio_path,
                        format!("narration could not be decoded: {e}"),
                    );
                    tracing::warn!(key = %clip.key, "skipping entry: {error}");
                    skipped.push(SkippedEntry {
                        key: clip.key,
                        error,
                    });
                }
            }
        }

        let placements = self.place(&kept);
        let mut segments = Vec::with_capacity(placements.len());
        for (placement, pcm) in placements.iter().zip(pcms) {
            let start_sample = self.secs_to_samples(placement.start_sec);
            let end_sample = self.secs_to_samples(placement.end_sec());
            tracing::debug!(
                key = %placement.key,
                start_sec = placement.start_sec,
                declared_sec = placement.duration_sec,
                decoded_sec = pcm.duration_sec(),
                "bound narration"
            );
            segments.push(AudioSegment {
                key: placement.key.clone(),
                start_sec: placement.start_sec,
                start_sample,
                len_samples: end_sample.saturating_sub(start_sample),
                volume: 1.0,
                pcm: Arc::new(pcm),
            });
        }
        tracing::info!(
            segments = segments.len(),
            skipped = skipped.len(),
            "bound audio"
        );
        Ok(BoundAudio {
            clips: kept,
            placements,
            segments,
            skipped,
        })
    }

    fn secs_to_samples(&self, secs: f64) -> u64 {
        (secs * f64::from(self.sample_rate)).round().max(0.0) as u64
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/binder.rs"]
mod tests;
