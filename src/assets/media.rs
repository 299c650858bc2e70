use std::path::Path;

use crate::foundation::error::{ReelError, ReelResult};

/// Internal audio mixing sample rate used across decode/mix/encode pipeline.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Channel count of the mixed audio bus.
pub const MIX_CHANNELS: u16 = 2;

#[derive(Clone, Debug)]
/// Decoded interleaved floating-point PCM.
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    /// Playback length in seconds.
    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}

/// Decode any ffmpeg-readable audio file (MP3 narration, WAV, ...) to stereo interleaved
/// `f32` PCM at `sample_rate`.
pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> ReelResult<AudioPcm> {
    if sample_rate == 0 {
        return Err(ReelError::validation("audio decode sample_rate must be > 0"));
    }

    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| {
            ReelError::Other(anyhow::anyhow!(
                "failed to run ffmpeg for audio decode (is it installed and on PATH?): {e}"
            ))
        })?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        return Err(ReelError::Other(anyhow::anyhow!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: MIX_CHANNELS,
        interleaved_f32: f32le_bytes_to_samples(&out.stdout)?,
    })
}

fn f32le_bytes_to_samples(bytes: &[u8]) -> ReelResult<Vec<f32>> {
    if !bytes.len().is_multiple_of(4) {
        return Err(ReelError::validation(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
