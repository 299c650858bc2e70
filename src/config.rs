//! Run configuration.
//!
//! Everything here is fixed for the duration of a run. Values are loaded from an optional JSON
//! file and individual fields may be overridden from the command line before the pipeline is
//! constructed.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::audio::binder::AudioMode;
use crate::clips::TransformPolicy;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};

/// Top-level configuration for one compositing run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    /// Canvas, frame rate and fade settings.
    pub video: VideoConfig,
    /// Pan/zoom settings.
    pub motion: MotionConfig,
    /// Audio binding settings.
    pub audio: AudioConfig,
    /// Encoder settings.
    pub encode: EncodeSettings,
    /// Asset naming settings.
    pub assets: AssetConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Canvas and timing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frame rate (integer fps).
    pub fps: u32,
    /// Fade-in and fade-out length in seconds; also the cross-dissolve overlap.
    pub fade_sec: f64,
}

/// Pan/zoom parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Uniform over-scale applied to every source image before sampling.
    pub headroom: f64,
    /// Extra scale reached by zoom transforms (`1.0 -> 1.0 + zoom_amount`).
    pub zoom_amount: f64,
    /// Border trimmed from every side of the visible crop window, in pixels.
    pub crop_margin: u32,
    /// How transforms are assigned to clips.
    pub policy: TransformPolicy,
}

/// Audio binding parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Mux narration into the output. When `false` the video is exported silent.
    pub enabled: bool,
    /// Sequential (back-to-back) or overlay binding.
    pub mode: AudioMode,
    /// Explicit start offsets (seconds) per asset key, used in overlay mode.
    pub overlay_starts: BTreeMap<String, f64>,
}

/// Encoder parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeSettings {
    /// ffmpeg video codec name.
    pub codec: String,
    /// ffmpeg video bitrate (for example `5000k`).
    pub bitrate: String,
    /// ffmpeg audio codec name, used when audio is muxed.
    pub audio_codec: String,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
}

/// Asset naming parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Extension of the still image paired with each audio segment.
    pub image_ext: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "storyreel=debug,warn").
    pub level: String,
    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            fade_sec: 2.0,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            headroom: 1.2,
            zoom_amount: 0.2,
            crop_margin: 50,
            policy: TransformPolicy::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: AudioMode::Sequential,
            overlay_starts: BTreeMap::new(),
        }
    }
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            bitrate: "5000k".to_string(),
            audio_codec: "aac".to_string(),
            overwrite: true,
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            image_ext: "jpg".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ReelConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_path(path: &Path) -> ReelResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: ReelConfig = serde_json::from_str(&text)
            .map_err(|e| ReelError::config(format!("parse '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the compositor cannot work with.
    pub fn validate(&self) -> ReelResult<()> {
        let v = &self.video;
        if v.width == 0 || v.height == 0 {
            return Err(ReelError::config("video width/height must be non-zero"));
        }
        if !v.width.is_multiple_of(2) || !v.height.is_multiple_of(2) {
            return Err(ReelError::config(
                "video width/height must be even (required for yuv420p output)",
            ));
        }
        if v.fps == 0 {
            return Err(ReelError::config("video fps must be non-zero"));
        }
        if !v.fade_sec.is_finite() || v.fade_sec < 0.0 {
            return Err(ReelError::config("video fade_sec must be finite and >= 0"));
        }

        let m = &self.motion;
        if !m.headroom.is_finite() || m.headroom < 1.0 {
            return Err(ReelError::config("motion headroom must be >= 1.0"));
        }
        if !m.zoom_amount.is_finite() || m.zoom_amount < 0.0 {
            return Err(ReelError::config("motion zoom_amount must be >= 0"));
        }
        if m.crop_margin.saturating_mul(2) >= v.width.min(v.height) {
            return Err(ReelError::config(
                "motion crop_margin leaves no visible area on the canvas",
            ));
        }

        if self.encode.codec.trim().is_empty() || self.encode.bitrate.trim().is_empty() {
            return Err(ReelError::config("encode codec and bitrate must be set"));
        }
        if self.assets.image_ext.trim().is_empty() || self.assets.image_ext.contains('.') {
            return Err(ReelError::config(
                "assets image_ext must be a bare extension such as 'jpg'",
            ));
        }
        for (key, start) in &self.audio.overlay_starts {
            if !start.is_finite() || *start < 0.0 {
                return Err(ReelError::config(format!(
                    "audio overlay start for '{key}' must be finite and >= 0"
                )));
            }
        }
        Ok(())
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.video.width,
            height: self.video.height,
        }
    }

    /// Output frame rate.
    pub fn fps(&self) -> ReelResult<Fps> {
        Fps::new(self.video.fps, 1)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
