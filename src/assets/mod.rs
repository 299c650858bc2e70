//! Still-image and narration-audio loading.
//!
//! All file IO for source assets happens here, before any frame is rendered.

pub mod decode;
pub mod media;

pub use decode::{PreparedImage, load_working_image};
pub use media::{AudioPcm, MIX_CHANNELS, MIX_SAMPLE_RATE, decode_audio_f32_stereo};
