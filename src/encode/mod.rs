//! Encoding sinks.
//!
//! Sinks consume rendered frames in timeline order; [`ffmpeg::FfmpegSink`] produces the final
//! video file.

/// `ffmpeg`-based sink (video file output via system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait and built-in sinks.
pub mod sink;

pub use ffmpeg::{FfmpegSink, FfmpegSinkOpts, ensure_parent_dir, is_ffmpeg_on_path, partial_path};
pub use sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
