use crate::audio::binder::AudioPlacement;
use crate::clips::VisualClip;
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::motion::{CropGeometry, TransformKind};

/// Run-wide inputs to sequencing.
#[derive(Clone, Copy, Debug)]
pub struct TimelineSettings {
    /// Output frame rate.
    pub fps: Fps,
    /// Configured canvas before margins are trimmed.
    pub canvas: Canvas,
    /// Border trimmed from every side of the canvas.
    pub crop_margin: u32,
    /// Cross-dissolve overlap between adjacent clips (the run's fade length).
    pub overlap_sec: f64,
}

impl TimelineSettings {
    /// Size of every output frame: the canvas minus the margin on each side.
    pub fn frame_size(&self) -> ReelResult<Canvas> {
        let trim = self.crop_margin.saturating_mul(2);
        if trim >= self.canvas.width || trim >= self.canvas.height {
            return Err(ReelError::validation(format!(
                "crop margin {} leaves no visible area on a {}x{} canvas",
                self.crop_margin, self.canvas.width, self.canvas.height
            )));
        }
        Ok(Canvas {
            width: self.canvas.width - trim,
            height: self.canvas.height - trim,
        })
    }
}

/// A clip placed on the timeline.
#[derive(Clone, Debug)]
pub struct TimelineEntry {
    /// The clip.
    pub clip: VisualClip,
    /// Crop geometry for this clip's working image.
    pub geometry: CropGeometry,
    /// Absolute video start in seconds.
    pub video_start_sec: f64,
    /// Narration placement, when audio was planned.
    pub audio: Option<AudioPlacement>,
}

impl TimelineEntry {
    /// Absolute video end in seconds.
    pub fn video_end_sec(&self) -> f64 {
        self.video_start_sec + self.clip.duration_sec
    }

    /// Seconds into this clip at timeline time `t`, or `None` when the clip is not showing.
    pub fn elapsed_at(&self, t: f64) -> Option<f64> {
        if t >= self.video_start_sec && t < self.video_end_sec() {
            Some(t - self.video_start_sec)
        } else {
            None
        }
    }
}

/// Ordered clips with resolved start times.
#[derive(Clone, Debug)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
    fps: Fps,
    frame_size: Canvas,
    video_duration_sec: f64,
    audio_duration_sec: f64,
}

impl Timeline {
    /// Place clips back to back, overlapping each adjacent pair by the run's fade length so
    /// the fade-out of one clip cross-dissolves into the fade-in of the next. The overlap never
    /// exceeds either clip of the pair.
    ///
    /// `audio` is either empty or holds one placement per clip, in clip order.
    #[tracing::instrument(skip_all, fields(clips = clips.len()))]
    pub fn sequence(
        clips: Vec<VisualClip>,
        audio: Vec<AudioPlacement>,
        settings: &TimelineSettings,
    ) -> ReelResult<Self> {
        if clips.is_empty() {
            return Err(ReelError::validation(
                "timeline has no clips; nothing to export",
            ));
        }
        if !audio.is_empty() && audio.len() != clips.len() {
            return Err(ReelError::validation(format!(
                "expected {} audio placements, got {}",
                clips.len(),
                audio.len()
            )));
        }
        if !settings.overlap_sec.is_finite() || settings.overlap_sec < 0.0 {
            return Err(ReelError::validation(format!(
                "clip overlap must be finite and >= 0, got {}",
                settings.overlap_sec
            )));
        }
        let frame_size = settings.frame_size()?;

        let mut audio = audio.into_iter();
        let mut entries = Vec::<TimelineEntry>::with_capacity(clips.len());
        let mut cursor = 0.0f64;
        for clip in clips {
            if let Some(prev) = entries.last() {
                let overlap = settings
                    .overlap_sec
                    .min(prev.clip.duration_sec)
                    .min(clip.duration_sec);
                cursor = prev.video_end_sec() - overlap;
            }
            let geometry = CropGeometry::new(
                Canvas {
                    width: clip.image.width,
                    height: clip.image.height,
                }
                .size(),
                frame_size.size(),
            )?;
            entries.push(TimelineEntry {
                clip,
                geometry,
                video_start_sec: cursor,
                audio: audio.next(),
            });
        }

        let video_duration_sec = entries
            .last()
            .map(TimelineEntry::video_end_sec)
            .unwrap_or(0.0);
        let audio_duration_sec = entries
            .iter()
            .filter_map(|e| e.audio.as_ref().map(AudioPlacement::end_sec))
            .fold(0.0f64, f64::max);

        let timeline = Self {
            entries,
            fps: settings.fps,
            frame_size,
            video_duration_sec,
            audio_duration_sec,
        };
        tracing::info!(
            clips = timeline.entries.len(),
            video_sec = timeline.video_duration_sec,
            audio_sec = timeline.audio_duration_sec,
            frames = timeline.frame_count(),
            "sequenced timeline"
        );
        if timeline.audio_duration_sec > timeline.video_duration_sec {
            tracing::debug!(
                tail_sec = timeline.audio_duration_sec - timeline.video_duration_sec,
                "narration runs past the last frame"
            );
        }
        Ok(timeline)
    }

    /// Entries in timeline order.
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// Output frame rate.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Output frame size.
    pub fn frame_size(&self) -> Canvas {
        self.frame_size
    }

    /// Video length in seconds.
    pub fn video_duration_sec(&self) -> f64 {
        self.video_duration_sec
    }

    /// End of the last narration segment in seconds; zero when no audio was planned.
    pub fn audio_duration_sec(&self) -> f64 {
        self.audio_duration_sec
    }

    /// Number of output frames: video length times fps, rounded.
    pub fn frame_count(&self) -> u64 {
        self.fps.secs_to_frames_round(self.video_duration_sec)
    }

    /// Timeline time of frame `f`.
    pub fn frame_time_sec(&self, f: FrameIndex) -> f64 {
        self.fps.frame_to_secs(f)
    }

    /// Entries showing at `t`, in timeline order, with their local elapsed time.
    pub fn active_at(&self, t: f64) -> impl Iterator<Item = (&TimelineEntry, f64)> + '_ {
        self.entries
            .iter()
            .filter_map(move |e| e.elapsed_at(t).map(|elapsed| (e, elapsed)))
    }

    /// Serializable summary for dry runs and reports.
    pub fn plan(&self) -> TimelinePlan {
        TimelinePlan {
            fps: self.fps.as_f64(),
            frame_width: self.frame_size.width,
            frame_height: self.frame_size.height,
            frame_count: self.frame_count(),
            video_duration_sec: self.video_duration_sec,
            audio_duration_sec: self.audio_duration_sec,
            clips: self
                .entries
                .iter()
                .map(|e| ClipPlan {
                    key: e.clip.key.to_string(),
                    image: e.clip.image_path.display().to_string(),
                    audio: e.clip.audio_path.display().to_string(),
                    video_start_sec: e.video_start_sec,
                    duration_sec: e.clip.duration_sec,
                    audio_start_sec: e.audio.as_ref().map(|a| a.start_sec),
                    transform: e.clip.transform.kind,
                    fade_in_sec: e.clip.fade.fade_in,
                    fade_out_sec: e.clip.fade.fade_out,
                    fade_clamped: e.clip.fade_clamped,
                })
                .collect(),
        }
    }
}

/// Resolved timeline, as printed by `storyreel plan`.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TimelinePlan {
    /// Output frame rate.
    pub fps: f64,
    /// Output frame width.
    pub frame_width: u32,
    /// Output frame height.
    pub frame_height: u32,
    /// Output frame count.
    pub frame_count: u64,
    /// Video length in seconds.
    pub video_duration_sec: f64,
    /// Narration length in seconds.
    pub audio_duration_sec: f64,
    /// Per-clip placement.
    pub clips: Vec<ClipPlan>,
}

/// One row of a [`TimelinePlan`].
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ClipPlan {
    /// Asset key.
    pub key: String,
    /// Image path.
    pub image: String,
    /// Audio path.
    pub audio: String,
    /// Absolute video start.
    pub video_start_sec: f64,
    /// Clip length.
    pub duration_sec: f64,
    /// Absolute narration start.
    pub audio_start_sec: Option<f64>,
    /// Motion.
    pub transform: TransformKind,
    /// Fitted fade-in.
    pub fade_in_sec: f64,
    /// Fitted fade-out.
    pub fade_out_sec: f64,
    /// Whether the fades were shortened.
    pub fade_clamped: bool,
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/sequencer.rs"]
mod tests;
