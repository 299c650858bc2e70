//! Narration binding and mixing.
//!
//! [`binder`] decides where each clip's narration sits on the audio timeline and loads its PCM;
//! [`mix`] flattens the bound segments into the single interleaved bus handed to the encoder.

pub mod binder;
pub mod mix;

pub use binder::{
    AudioBinder, AudioMode, AudioPlacement, AudioSegment, BoundAudio, FfmpegPcmLoader,
    OverlaySchedule, PcmLoader,
};
pub use mix::{AudioBus, mix_bus, write_mix_to_f32le_file};
