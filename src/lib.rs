//! storyreel turns narrated still images into a video.
//!
//! A duration manifest lists one narration file per line with its length. Each entry's still
//! image becomes a clip that lasts exactly that long, gets a slow pan or zoom, and fades in and
//! out. Adjacent clips overlap by the fade length so they cross-dissolve, and the narration is
//! laid on its own track before everything is encoded with the system `ffmpeg`.
//!
//! - Load a [`ReelConfig`] (or use the defaults)
//! - Create a [`Pipeline`] with the manifest, image and audio locations
//! - Call [`Pipeline::run`] for a full export, or [`Pipeline::plan`] for a dry run
#![forbid(unsafe_code)]

pub mod assets;
pub mod audio;
pub mod clips;
pub mod config;
pub mod encode;
mod foundation;
pub mod logging;
pub mod manifest;
pub mod motion;
pub mod pipeline;
pub mod render;
pub mod timeline;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange, Rect, Size, Vec2};
pub use crate::foundation::error::{PipelineStage, ReelError, ReelResult};

pub use crate::audio::{AudioBinder, AudioMode, BoundAudio, OverlaySchedule, PcmLoader};
pub use crate::clips::{ClipBatch, ClipBuilder, TransformPolicy, VisualClip};
pub use crate::config::{LoggingConfig, ReelConfig};
pub use crate::encode::{FfmpegSink, FfmpegSinkOpts, FrameSink, InMemorySink, is_ffmpeg_on_path};
pub use crate::manifest::{AssetKey, DurationEntry, DurationManifest};
pub use crate::motion::{FadeEnvelope, Transform, TransformKind};
pub use crate::pipeline::{Pipeline, PipelineInputs, PlannedRun, RunReport};
pub use crate::render::{FrameRGBA, RenderThreading};
pub use crate::timeline::{Timeline, TimelinePlan};
