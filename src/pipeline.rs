//! End-to-end compositing run: manifest, clips, narration, timeline, export.

use std::path::{Path, PathBuf};

use crate::audio::binder::{AudioBinder, FfmpegPcmLoader, OverlaySchedule, PcmLoader};
use crate::audio::mix::{AudioBus, mix_bus};
use crate::clips::{ClipBatch, ClipBuilder, ClipBuilderOptions, SkippedEntry};
use crate::config::ReelConfig;
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::FrameSink;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{PipelineStage, ReelResult};
use crate::manifest::{DurationManifest, ManifestOptions};
use crate::motion::{FadeEnvelope, TransformParams};
use crate::render::compose::{FrameRGBA, render_frame};
use crate::render::pipeline::{ExportOptions, RenderThreading, export};
use crate::timeline::{Timeline, TimelineSettings};

/// Filesystem locations for one run.
#[derive(Clone, Debug)]
pub struct PipelineInputs {
    /// Duration manifest.
    pub manifest: PathBuf,
    /// Directory of still images.
    pub images_dir: PathBuf,
    /// Directory of narration audio.
    pub audio_dir: PathBuf,
}

/// A manifest entry that was left out of the video.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SkippedReport {
    /// Asset key.
    pub key: String,
    /// Human-readable cause.
    pub reason: String,
}

/// Summary of a finished run.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct RunReport {
    /// Encoded file, when the run wrote one.
    pub output: Option<PathBuf>,
    /// Clips on the timeline.
    pub clips: usize,
    /// Entries skipped for missing assets.
    pub skipped: Vec<SkippedReport>,
    /// Manifest lines that could not be parsed.
    pub malformed_lines: usize,
    /// Keys whose fades were clamped to fit the clip.
    pub clamped_fades: Vec<String>,
    /// Video length in seconds.
    pub video_duration_sec: f64,
    /// Narration length in seconds; zero when exported silent.
    pub audio_duration_sec: f64,
    /// Frames delivered to the sink.
    pub frames_written: u64,
}

/// A built timeline plus what was dropped on the way.
#[derive(Debug)]
pub struct PlannedRun {
    /// Sequenced clips.
    pub timeline: Timeline,
    /// Entries skipped for missing assets.
    pub skipped: Vec<SkippedReport>,
    /// Manifest lines that could not be parsed.
    pub malformed_lines: usize,
}

impl PlannedRun {
    fn report(&self) -> RunReport {
        RunReport {
            output: None,
            clips: self.timeline.entries().len(),
            skipped: self.skipped.clone(),
            malformed_lines: self.malformed_lines,
            clamped_fades: self
                .timeline
                .entries()
                .iter()
                .filter(|e| e.clip.fade_clamped)
                .map(|e| e.clip.key.to_string())
                .collect(),
            video_duration_sec: self.timeline.video_duration_sec(),
            audio_duration_sec: self.timeline.audio_duration_sec(),
            frames_written: 0,
        }
    }
}

/// One compositing run with fixed configuration and injected paths.
pub struct Pipeline {
    config: ReelConfig,
    inputs: PipelineInputs,
    threading: RenderThreading,
    loader: Box<dyn PcmLoader>,
}

impl Pipeline {
    /// Validate `config` and create a pipeline that decodes narration with `ffmpeg`.
    pub fn new(config: ReelConfig, inputs: PipelineInputs) -> ReelResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            inputs,
            threading: RenderThreading::default(),
            loader: Box::new(FfmpegPcmLoader::default()),
        })
    }

    /// Set frame rendering parallelism.
    pub fn with_threading(mut self, threading: RenderThreading) -> Self {
        self.threading = threading;
        self
    }

    /// Replace the narration decoder.
    pub fn with_pcm_loader(mut self, loader: Box<dyn PcmLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Run configuration.
    pub fn config(&self) -> &ReelConfig {
        &self.config
    }

    /// Build the timeline without decoding narration or encoding anything.
    #[tracing::instrument(skip_all, fields(manifest = %self.inputs.manifest.display()))]
    pub fn plan(&self) -> ReelResult<PlannedRun> {
        let manifest = self.read_manifest()?;
        let batch = self.build_clips(&manifest);
        let skipped = skipped_reports(&batch.skipped);

        let placements = if self.config.audio.enabled {
            self.audio_binder()?.place(&batch.clips)
        } else {
            Vec::new()
        };
        let timeline = Timeline::sequence(batch.clips, placements, &self.timeline_settings()?)
            .map_err(|e| e.at_stage(PipelineStage::Sequence))?;

        Ok(PlannedRun {
            timeline,
            skipped,
            malformed_lines: manifest.malformed_lines(),
        })
    }

    /// Render a single frame of the planned timeline.
    pub fn render_preview_frame(&self, frame: FrameIndex) -> ReelResult<FrameRGBA> {
        let planned = self.plan()?;
        render_frame(&planned.timeline, frame)
    }

    /// Full run into the system `ffmpeg`, writing `output`.
    pub fn run(&self, output: &Path) -> ReelResult<RunReport> {
        let mut sink = FfmpegSink::new(FfmpegSinkOpts::from_settings(
            output,
            &self.config.encode,
        ));
        let mut report = self.run_with_sink(&mut sink)?;
        report.output = Some(output.to_path_buf());
        Ok(report)
    }

    /// Full run into any sink.
    #[tracing::instrument(skip_all, fields(manifest = %self.inputs.manifest.display()))]
    pub fn run_with_sink(&self, sink: &mut dyn FrameSink) -> ReelResult<RunReport> {
        let manifest = self.read_manifest()?;
        let ClipBatch {
            clips,
            skipped: mut skipped_entries,
        } = self.build_clips(&manifest);

        let (clips, placements, bus) = if self.config.audio.enabled {
            let binder = self.audio_binder()?;
            let bound = binder
                .bind(clips, self.loader.as_ref())
                .map_err(|e| e.at_stage(PipelineStage::Audio))?;
            let bus = mix_bus(&bound.segments, binder.sample_rate());
            tracing::info!(
                segments = bound.segments.len(),
                duration_sec = bus.duration_sec(),
                "mixed narration"
            );
            skipped_entries.extend(bound.skipped);
            (bound.clips, bound.placements, Some(bus))
        } else {
            tracing::info!("audio disabled; exporting silent video");
            (clips, Vec::new(), None::<AudioBus>)
        };

        let planned = PlannedRun {
            timeline: Timeline::sequence(clips, placements, &self.timeline_settings()?)
                .map_err(|e| e.at_stage(PipelineStage::Sequence))?,
            skipped: skipped_reports(&skipped_entries),
            malformed_lines: manifest.malformed_lines(),
        };

        let opts = ExportOptions {
            threading: self.threading.clone(),
        };
        let stats = export(&planned.timeline, bus.as_ref(), &opts, sink)
            .map_err(|e| e.at_stage(PipelineStage::Encode))?;

        let mut report = planned.report();
        report.frames_written = stats.frames_total;
        tracing::info!(
            clips = report.clips,
            skipped = report.skipped.len(),
            clamped_fades = report.clamped_fades.len(),
            video_sec = report.video_duration_sec,
            audio_sec = report.audio_duration_sec,
            frames = report.frames_written,
            "run complete"
        );
        Ok(report)
    }

    fn read_manifest(&self) -> ReelResult<DurationManifest> {
        let opts = ManifestOptions {
            audio_dir: self.inputs.audio_dir.clone(),
            image_ext: self.config.assets.image_ext.clone(),
        };
        DurationManifest::read(&self.inputs.manifest, &opts)
            .map_err(|e| e.at_stage(PipelineStage::Manifest))
    }

    fn build_clips(&self, manifest: &DurationManifest) -> ClipBatch {
        let motion = &self.config.motion;
        let working = self.config.canvas().scaled(motion.headroom);
        ClipBuilder::new(ClipBuilderOptions {
            images_dir: self.inputs.images_dir.clone(),
            working,
            params: TransformParams {
                zoom_amount: motion.zoom_amount,
            },
            policy: motion.policy,
            fade: FadeEnvelope::symmetric(self.config.video.fade_sec),
        })
        .build_all(manifest)
    }

    fn audio_binder(&self) -> ReelResult<AudioBinder> {
        let schedule = OverlaySchedule::new(self.config.audio.overlay_starts.clone())
            .map_err(|e| e.at_stage(PipelineStage::Audio))?;
        Ok(AudioBinder::new(self.config.audio.mode, schedule))
    }

    fn timeline_settings(&self) -> ReelResult<TimelineSettings> {
        Ok(TimelineSettings {
            fps: self
                .config
                .fps()
                .map_err(|e| e.at_stage(PipelineStage::Sequence))?,
            canvas: self.config.canvas(),
            crop_margin: self.config.motion.crop_margin,
            overlap_sec: self.config.video.fade_sec,
        })
    }
}

fn skipped_reports(skipped: &[SkippedEntry]) -> Vec<SkippedReport> {
    skipped
        .iter()
        .map(|s| SkippedReport {
            key: s.key.to_string(),
            reason: s.error.to_string(),
        })
        .collect()
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
