//! Time-parametric clip motion: pan/zoom transforms and fade envelopes.
//!
//! Everything here is a pure function of `(elapsed, duration)`; sampling density is chosen by
//! the renderer's frame rate, not by this module.

pub mod fade;
pub mod transform;

pub use fade::{FadeEnvelope, FittedFade};
pub use transform::{
    CropGeometry, MotionSample, Transform, TransformKind, TransformParams, normalized_time,
};
