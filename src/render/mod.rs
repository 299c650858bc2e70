//! Frame rendering: per-frame compositing and the chunked export loop.

pub mod compose;
pub mod pipeline;

pub use compose::{FrameRGBA, render_frame};
pub use pipeline::{ExportOptions, RenderStats, RenderThreading, export, render_frames};
