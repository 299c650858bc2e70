use std::fmt;
use std::str::FromStr;

use crate::foundation::core::{Rect, Size, Vec2};
use crate::foundation::error::{ReelError, ReelResult};

/// The fixed set of pan/zoom motions a clip can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Scale grows from `1` to `1 + k`.
    ZoomIn,
    /// Scale shrinks from `1 + k` to `1`.
    ZoomOut,
    /// Start at the top-left corner, drift to center.
    PanFromTopLeft,
    /// Start at the top-right corner, drift to center.
    PanFromTopRight,
    /// Start at the bottom-left corner, drift to center.
    PanFromBottomLeft,
    /// Start at the bottom-right corner, drift to center.
    PanFromBottomRight,
}

impl TransformKind {
    /// Every kind, in declaration order.
    pub const ALL: [TransformKind; 6] = [
        Self::ZoomIn,
        Self::ZoomOut,
        Self::PanFromTopLeft,
        Self::PanFromTopRight,
        Self::PanFromBottomLeft,
        Self::PanFromBottomRight,
    ];

    /// Stable snake_case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::ZoomIn => "zoom_in",
            Self::ZoomOut => "zoom_out",
            Self::PanFromTopLeft => "pan_from_top_left",
            Self::PanFromTopRight => "pan_from_top_right",
            Self::PanFromBottomLeft => "pan_from_bottom_left",
            Self::PanFromBottomRight => "pan_from_bottom_right",
        }
    }

    /// Starting corner for pan kinds, as a normalized offset. `None` for zooms.
    fn corner(self) -> Option<Vec2> {
        match self {
            Self::ZoomIn | Self::ZoomOut => None,
            Self::PanFromTopLeft => Some(Vec2::new(-1.0, -1.0)),
            Self::PanFromTopRight => Some(Vec2::new(1.0, -1.0)),
            Self::PanFromBottomLeft => Some(Vec2::new(-1.0, 1.0)),
            Self::PanFromBottomRight => Some(Vec2::new(1.0, 1.0)),
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.name() == norm)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|k| k.name()).collect();
                format!(
                    "unknown transform '{s}' (expected one of: {})",
                    names.join(", ")
                )
            })
    }
}

/// Parameters shared by every transform in a run.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransformParams {
    /// Extra scale reached by zoom kinds.
    pub zoom_amount: f64,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self { zoom_amount: 0.2 }
    }
}

/// Scale and normalized position produced by a transform at one instant.
///
/// `offset` is a fraction of the available slack on each axis, in `[-1, 1]`: `-1` pins the
/// window to the left/top edge, `1` to the right/bottom edge, `0` centers it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionSample {
    /// Uniform scale applied to the working source (`>= 1`).
    pub scale: f64,
    /// Normalized window offset.
    pub offset: Vec2,
}

/// A clip's motion: kind plus run-wide parameters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Transform {
    /// Which motion.
    pub kind: TransformKind,
    /// Shared parameters.
    #[serde(skip)]
    pub params: TransformParams,
}

impl Transform {
    /// Create a transform.
    pub fn new(kind: TransformKind, params: TransformParams) -> Self {
        Self { kind, params }
    }

    /// Evaluate at `elapsed` seconds into a clip lasting `duration` seconds.
    pub fn sample(&self, elapsed: f64, duration: f64) -> MotionSample {
        let u = normalized_time(elapsed, duration);
        let k = self.params.zoom_amount.max(0.0);
        match self.kind {
            TransformKind::ZoomIn => MotionSample {
                scale: 1.0 + k * u,
                offset: Vec2::ZERO,
            },
            TransformKind::ZoomOut => MotionSample {
                scale: 1.0 + k * (1.0 - u),
                offset: Vec2::ZERO,
            },
            kind => {
                let corner = kind.corner().unwrap_or(Vec2::ZERO);
                MotionSample {
                    scale: 1.0,
                    offset: corner.lerp(Vec2::ZERO, u),
                }
            }
        }
    }
}

/// Map elapsed clip time to `[0, 1]`. Non-positive durations sit at the end state.
pub fn normalized_time(elapsed: f64, duration: f64) -> f64 {
    if duration.is_nan() || duration <= 0.0 || !elapsed.is_finite() {
        return 1.0;
    }
    (elapsed / duration).clamp(0.0, 1.0)
}

/// Resolves motion samples into crop windows over a working source image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropGeometry {
    /// Working source size in pixels (canvas times headroom).
    pub source: Size,
    /// Visible crop size in pixels (canvas minus margins).
    pub crop: Size,
}

impl CropGeometry {
    /// Create a geometry; the crop must fit inside the unscaled source.
    pub fn new(source: Size, crop: Size) -> ReelResult<Self> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(crop.width) || !positive(crop.height) {
            return Err(ReelError::validation("crop size must be non-zero"));
        }
        if crop.width > source.width || crop.height > source.height {
            return Err(ReelError::validation(format!(
                "crop {}x{} does not fit inside source {}x{}",
                crop.width, crop.height, source.width, source.height
            )));
        }
        Ok(Self { source, crop })
    }

    /// Crop window in source pixel coordinates for `sample`.
    ///
    /// The source is scaled by `sample.scale`, a `crop`-sized window is centered on it and
    /// shifted by `offset * slack`, then the window is mapped back to unscaled source pixels.
    /// The result always lies within `[0, source.width] x [0, source.height]`.
    pub fn window(&self, sample: MotionSample) -> Rect {
        let scale = if sample.scale.is_finite() {
            sample.scale.max(1.0)
        } else {
            1.0
        };
        let ox = finite_or_zero(sample.offset.x).clamp(-1.0, 1.0);
        let oy = finite_or_zero(sample.offset.y).clamp(-1.0, 1.0);

        let w = self.crop.width / scale;
        let h = self.crop.height / scale;
        let slack_x = ((self.source.width - w) * 0.5).max(0.0);
        let slack_y = ((self.source.height - h) * 0.5).max(0.0);

        let cx = self.source.width * 0.5 + ox * slack_x;
        let cy = self.source.height * 0.5 + oy * slack_y;
        Rect::new(cx - w * 0.5, cy - h * 0.5, cx + w * 0.5, cy + h * 0.5)
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

#[cfg(test)]
#[path = "../../tests/unit/motion/transform.rs"]
mod tests;
