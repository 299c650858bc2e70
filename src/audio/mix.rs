use std::path::Path;

use anyhow::Context as _;

use crate::assets::media::MIX_CHANNELS;
use crate::audio::binder::AudioSegment;
use crate::foundation::error::{ReelError, ReelResult};

/// Mixed narration, ready to be muxed.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBus {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count (always stereo).
    pub channels: u16,
    /// Interleaved `f32` samples, clamped to `[-1, 1]`.
    pub interleaved_f32: Vec<f32>,
}

impl AudioBus {
    /// Length in sample frames.
    pub fn frames(&self) -> usize {
        self.interleaved_f32.len() / usize::from(self.channels.max(1))
    }

    /// Length in seconds.
    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Whether the bus holds no samples.
    pub fn is_empty(&self) -> bool {
        self.interleaved_f32.is_empty()
    }
}

/// Sum every segment into one stereo bus.
///
/// The bus ends where the last segment ends. Each segment contributes exactly `len_samples`
/// frames: source PCM past that is dropped and missing source frames are silence. Sources at
/// another rate are linearly resampled; mono sources are duplicated to both channels.
pub fn mix_bus(segments: &[AudioSegment], sample_rate: u32) -> AudioBus {
    let total_frames = segments
        .iter()
        .map(AudioSegment::end_sample)
        .max()
        .unwrap_or(0) as usize;
    let channels = MIX_CHANNELS;
    let mut out = vec![0.0f32; total_frames * usize::from(channels)];

    for seg in segments {
        mix_segment(&mut out, sample_rate, seg);
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    AudioBus {
        sample_rate,
        channels,
        interleaved_f32: out,
    }
}

fn mix_segment(out: &mut [f32], sample_rate: u32, seg: &AudioSegment) {
    if seg.len_samples == 0 || seg.volume == 0.0 || sample_rate == 0 {
        return;
    }
    let pcm = seg.pcm.as_ref();
    if pcm.channels == 0 || pcm.sample_rate == 0 {
        return;
    }
    let src = pcm.interleaved_f32.as_slice();
    let src_channels = usize::from(pcm.channels);
    let src_frames = pcm.frames();
    if src_frames == 0 {
        return;
    }
    let dst_channels = usize::from(MIX_CHANNELS);
    let step = f64::from(pcm.sample_rate) / f64::from(sample_rate);

    for rel in 0..seg.len_samples {
        let src_pos = rel as f64 * step;
        let src_frame0 = src_pos.floor() as usize;
        if src_frame0 >= src_frames {
            break;
        }
        let src_frame1 = (src_frame0 + 1).min(src_frames - 1);
        let frac = (src_pos - src_frame0 as f64) as f32;

        let (l, r) = if src_channels == 1 {
            let v0 = src[src_frame0];
            let v1 = src[src_frame1];
            let v = v0 + ((v1 - v0) * frac);
            (v, v)
        } else {
            let i0 = src_frame0 * src_channels;
            let i1 = src_frame1 * src_channels;
            let (l0, l1) = (src[i0], src[i1]);
            let (r0, r1) = (src[i0 + 1], src[i1 + 1]);
            (l0 + ((l1 - l0) * frac), r0 + ((r1 - r0) * frac))
        };

        let dst_idx = (seg.start_sample + rel) as usize * dst_channels;
        if dst_idx + 1 >= out.len() {
            break;
        }
        out[dst_idx] += l * seg.volume;
        out[dst_idx + 1] += r * seg.volume;
    }
}

/// Write interleaved samples as raw little-endian `f32` for the encoder's audio input.
pub fn write_mix_to_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> ReelResult<()> {
    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| {
            format!(
                "create audio mix output directory '{}'",
                parent.display()
            )
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        ReelError::Other(anyhow::anyhow!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
