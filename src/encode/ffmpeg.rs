use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use anyhow::Context as _;

use crate::config::EncodeSettings;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::compose::FrameRGBA;

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Final output path.
    pub out_path: PathBuf,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
    /// ffmpeg video codec.
    pub codec: String,
    /// ffmpeg video bitrate.
    pub bitrate: String,
    /// ffmpeg audio codec, used when audio is muxed.
    pub audio_codec: String,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegSinkOpts {
    /// Defaults for writing to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self::from_settings(out_path, &EncodeSettings::default())
    }

    /// Options built from the run's encoder settings.
    pub fn from_settings(out_path: impl Into<PathBuf>, settings: &EncodeSettings) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: settings.overwrite,
            codec: settings.codec.clone(),
            bitrate: settings.bitrate.clone(),
            audio_codec: settings.audio_codec.clone(),
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Spawns the system `ffmpeg` and streams raw frames to its stdin.
///
/// ffmpeg writes to [`partial_path`] next to the output; the file is renamed into place only
/// when ffmpeg exits cleanly and is removed on any failure.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    partial: PathBuf,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Create a sink; nothing is spawned until `begin`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        let partial = partial_path(&opts.out_path);
        Self {
            opts,
            partial,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }

    /// Final output path.
    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }

    fn build_command(&self, cfg: &SinkConfig) -> ReelResult<Command> {
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg("-y");

        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0"]);

        if let Some(audio) = cfg.audio.as_ref() {
            if audio.sample_rate == 0 || audio.channels == 0 {
                return Err(ReelError::validation(
                    "audio sample_rate and channels must be non-zero when audio is enabled",
                ));
            }
            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &audio.sample_rate.to_string(),
                "-ac",
                &audio.channels.to_string(),
                "-i",
            ])
            .arg(&audio.path)
            .args(["-c:a", &self.opts.audio_codec]);
        } else {
            cmd.arg("-an");
        }
        cmd.args([
            "-c:v",
            &self.opts.codec,
            "-b:v",
            &self.opts.bitrate,
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]);
        cmd.arg(&self.partial);
        Ok(cmd)
    }

    fn discard_partial(&self) {
        if self.partial.exists()
            && let Err(e) = std::fs::remove_file(&self.partial)
        {
            tracing::warn!(path = %self.partial.display(), "failed to remove partial output: {e}");
        }
    }

    /// Wait for an ffmpeg that stopped reading frames and return what it printed.
    fn reap_after_write_failure(&mut self) -> Vec<u8> {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.wait();
        }
        self.cfg = None;
        self.discard_partial();
        self.stderr_drain
            .take()
            .and_then(|handle| handle.join().ok())
            .and_then(Result::ok)
            .unwrap_or_default()
    }

    fn kill_child(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(ReelError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(ReelError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(ReelError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(ReelError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(ReelError::encode(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }

        let mut cmd = self.build_command(&cfg)?;
        tracing::debug!(?cmd, "spawning ffmpeg");
        let mut child = cmd.spawn().map_err(|e| {
            ReelError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::encode("failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelError::encode("failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(ReelError::encode(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(ReelError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ReelError::encode("ffmpeg sink is already finalized"));
        };
        use std::io::Write as _;
        if let Err(e) = stdin.write_all(&self.scratch) {
            let stderr = self.reap_after_write_failure();
            return Err(stdin_write_error(&e, &stderr));
        }
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ReelError::encode("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            ReelError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        });
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ReelError::encode("ffmpeg stderr drain thread panicked"))
                .and_then(|r| {
                    r.map_err(|e| ReelError::encode(format!("ffmpeg stderr read failed: {e}")))
                }),
            None => Ok(Vec::new()),
        };
        self.cfg = None;

        let status = match (status, stderr_bytes) {
            (Ok(status), Ok(stderr)) if !status.success() => {
                self.discard_partial();
                return Err(ReelError::encode(format!(
                    "ffmpeg exited with status {}: {}",
                    status,
                    String::from_utf8_lossy(&stderr).trim()
                )));
            }
            (Ok(status), Ok(_)) => status,
            (Err(e), _) | (_, Err(e)) => {
                self.discard_partial();
                return Err(e);
            }
        };

        if let Err(e) = std::fs::rename(&self.partial, &self.opts.out_path) {
            self.discard_partial();
            return Err(ReelError::encode(format!(
                "failed to move '{}' to '{}': {e}",
                self.partial.display(),
                self.opts.out_path.display()
            )));
        }
        tracing::info!(path = %self.opts.out_path.display(), %status, "encoded video");
        Ok(())
    }

    fn abort(&mut self) {
        self.kill_child();
        self.cfg = None;
        self.discard_partial();
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

fn stdin_write_error(err: &std::io::Error, stderr: &[u8]) -> ReelError {
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        ReelError::encode(format!("failed to write frame to ffmpeg stdin: {err}"))
    } else {
        ReelError::encode(format!("ffmpeg stopped accepting frames ({err}): {stderr}"))
    }
}

/// Where ffmpeg writes before the output is renamed into place: `clip.mp4` becomes
/// `clip.partial.mp4`, keeping the extension ffmpeg picks the container from.
pub fn partial_path(out_path: &Path) -> PathBuf {
    let stem = out_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match out_path.extension() {
        Some(ext) => format!("{stem}.partial.{}", ext.to_string_lossy()),
        None => format!("{stem}.partial"),
    };
    out_path.with_file_name(name)
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // rawvideo needs the input rate before `-i`.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> ReelResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(ReelError::validation(
            "frame data size does not match width*height*4",
        ));
    }

    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        if s[3] == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255u16 - u16::from(s[3]);
        for i in 0..3 {
            d[i] = (u16::from(s[i]) + mul_div255_u16(bg[i], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
