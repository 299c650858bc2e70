use rayon::prelude::*;

use crate::audio::mix::{AudioBus, write_mix_to_f32le_file};
use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::compose::{FrameRGBA, render_frame};
use crate::timeline::Timeline;

/// Frame rendering parallelism.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderThreading {
    /// Render each chunk's frames on a rayon pool.
    pub parallel: bool,
    /// Frames rendered per chunk before they are handed to the sink.
    pub chunk_size: usize,
    /// Worker count; rayon's default when unset.
    pub threads: Option<usize>,
}

impl Default for RenderThreading {
    fn default() -> Self {
        Self {
            parallel: false,
            chunk_size: 64,
            threads: None,
        }
    }
}

/// Counters from one export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames delivered to the sink.
    pub frames_total: u64,
    /// Chunks rendered.
    pub chunks: u64,
}

/// Options for [`export`].
#[derive(Clone, Debug, Default)]
pub struct ExportOptions {
    /// Render threading/chunking configuration.
    pub threading: RenderThreading,
}

/// Render `range` into memory.
pub fn render_frames(
    timeline: &Timeline,
    range: FrameRange,
    threading: &RenderThreading,
) -> ReelResult<Vec<FrameRGBA>> {
    if range.is_empty() {
        return Err(ReelError::validation("render range must be non-empty"));
    }
    let pool = threading
        .parallel
        .then(|| build_thread_pool(threading.threads))
        .transpose()?;
    render_chunk(timeline, range, pool.as_ref())
}

/// Render every frame of `timeline` into `sink`, muxing `audio` when given.
///
/// Frames reach the sink in strictly increasing order whether or not chunks are rendered in
/// parallel. On any failure after `begin` the sink is aborted.
#[tracing::instrument(skip_all, fields(frames = timeline.frame_count(), audio = audio.is_some()))]
pub fn export(
    timeline: &Timeline,
    audio: Option<&AudioBus>,
    opts: &ExportOptions,
    sink: &mut dyn FrameSink,
) -> ReelResult<RenderStats> {
    let total = timeline.frame_count();
    if total == 0 {
        return Err(ReelError::validation("timeline has no frames to export"));
    }

    let mut audio_tmp = TempFileGuard(None);
    let audio_cfg = match audio {
        Some(bus) if !bus.is_empty() => {
            let path = std::env::temp_dir().join(format!(
                "storyreel_audio_mix_{}_{}.f32le",
                std::process::id(),
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos())
                    .unwrap_or(0)
            ));
            write_mix_to_f32le_file(&bus.interleaved_f32, &path)?;
            audio_tmp.0 = Some(path.clone());
            Some(AudioInputConfig {
                path,
                sample_rate: bus.sample_rate,
                channels: bus.channels,
            })
        }
        _ => None,
    };

    let size = timeline.frame_size();
    sink.begin(SinkConfig {
        width: size.width,
        height: size.height,
        fps: timeline.fps(),
        audio: audio_cfg,
    })?;

    match stream_frames(timeline, total, &opts.threading, sink) {
        Ok(stats) => {
            sink.end()?;
            drop(audio_tmp);
            tracing::info!(frames = stats.frames_total, chunks = stats.chunks, "exported");
            Ok(stats)
        }
        Err(e) => {
            sink.abort();
            Err(e)
        }
    }
}

fn stream_frames(
    timeline: &Timeline,
    total: u64,
    threading: &RenderThreading,
    sink: &mut dyn FrameSink,
) -> ReelResult<RenderStats> {
    let pool = threading
        .parallel
        .then(|| build_thread_pool(threading.threads))
        .transpose()?;
    let chunk_size = normalized_chunk_size(threading.chunk_size);

    let mut stats = RenderStats::default();
    let mut chunk_start = 0u64;
    while chunk_start < total {
        let chunk_end = (chunk_start + chunk_size).min(total);
        let chunk = FrameRange::new(FrameIndex(chunk_start), FrameIndex(chunk_end))?;
        let frames = render_chunk(timeline, chunk, pool.as_ref())?;
        for (f, frame) in (chunk.start.0..chunk.end.0).zip(&frames) {
            sink.push_frame(FrameIndex(f), frame)?;
        }
        stats.frames_total += chunk.len_frames();
        stats.chunks += 1;
        tracing::debug!(start = chunk_start, end = chunk_end, "chunk rendered");
        chunk_start = chunk_end;
    }
    Ok(stats)
}

fn render_chunk(
    timeline: &Timeline,
    range: FrameRange,
    pool: Option<&rayon::ThreadPool>,
) -> ReelResult<Vec<FrameRGBA>> {
    match pool {
        None => (range.start.0..range.end.0)
            .map(|f| render_frame(timeline, FrameIndex(f)))
            .collect(),
        Some(pool) => pool.install(|| {
            (range.start.0..range.end.0)
                .into_par_iter()
                .map(|f| render_frame(timeline, FrameIndex(f)))
                .collect()
        }),
    }
}

fn build_thread_pool(threads: Option<usize>) -> ReelResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(ReelError::validation(
            "render threading 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ReelError::validation(format!("failed to build rayon thread pool: {e}")))
}

fn normalized_chunk_size(chunk_size: usize) -> u64 {
    chunk_size.max(1) as u64
}

struct TempFileGuard(Option<std::path::PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
