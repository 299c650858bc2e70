use super::*;
use crate::clips::test_clip;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::{Canvas, Fps};
use crate::motion::FadeEnvelope;
use crate::timeline::TimelineSettings;

fn timeline() -> Timeline {
    let working = Canvas {
        width: 12,
        height: 12,
    };
    let mut a = test_clip("a", 1.0, working, [255, 0, 0, 255]);
    a.fade = FadeEnvelope::symmetric(0.4);
    let mut b = test_clip("b", 1.0, working, [0, 0, 255, 255]);
    b.fade = FadeEnvelope::symmetric(0.4);
    Timeline::sequence(
        vec![a, b],
        Vec::new(),
        &TimelineSettings {
            fps: Fps::new(10, 1).unwrap(),
            canvas: Canvas {
                width: 10,
                height: 10,
            },
            crop_margin: 1,
            overlap_sec: 0.4,
        },
    )
    .unwrap()
}

struct FailingSink {
    pushed: u64,
    aborted: bool,
}

impl FrameSink for FailingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> ReelResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, _idx: FrameIndex, _frame: &FrameRGBA) -> ReelResult<()> {
        self.pushed += 1;
        if self.pushed == 3 {
            return Err(ReelError::encode("disk full"));
        }
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

#[test]
fn export_delivers_every_frame_in_order() {
    let tl = timeline();
    let mut sink = InMemorySink::new();
    let stats = export(
        &tl,
        None,
        &ExportOptions {
            threading: RenderThreading {
                chunk_size: 4,
                ..RenderThreading::default()
            },
        },
        &mut sink,
    )
    .unwrap();

    assert_eq!(tl.frame_count(), 16);
    assert_eq!(stats.frames_total, 16);
    assert_eq!(stats.chunks, 4);
    let idx: Vec<u64> = sink.frames().iter().map(|(i, _)| i.0).collect();
    assert_eq!(idx, (0..16).collect::<Vec<_>>());
    assert!(sink.is_finished());
    let cfg = sink.config().unwrap();
    assert_eq!((cfg.width, cfg.height), (8, 8));
    assert!(cfg.audio.is_none());
}

#[test]
fn parallel_rendering_matches_sequential() {
    let tl = timeline();
    let mut seq = InMemorySink::new();
    export(&tl, None, &ExportOptions::default(), &mut seq).unwrap();

    let mut par = InMemorySink::new();
    let opts = ExportOptions {
        threading: RenderThreading {
            parallel: true,
            chunk_size: 3,
            threads: Some(2),
        },
    };
    export(&tl, None, &opts, &mut par).unwrap();

    assert_eq!(seq.frames(), par.frames());
}

#[test]
fn sink_failure_aborts_the_sink() {
    let tl = timeline();
    let mut sink = FailingSink {
        pushed: 0,
        aborted: false,
    };
    let err = export(&tl, None, &ExportOptions::default(), &mut sink).unwrap_err();
    assert!(matches!(err, ReelError::Encode(_)));
    assert!(sink.aborted);
}

#[test]
fn zero_threads_is_rejected() {
    let tl = timeline();
    let threading = RenderThreading {
        parallel: true,
        chunk_size: 8,
        threads: Some(0),
    };
    let range = FrameRange::new(FrameIndex(0), FrameIndex(2)).unwrap();
    assert!(render_frames(&tl, range, &threading).is_err());
}

#[test]
fn audio_bus_is_handed_to_the_sink() {
    let tl = timeline();
    let bus = AudioBus {
        sample_rate: 100,
        channels: 2,
        interleaved_f32: vec![0.0; 400],
    };
    let mut sink = InMemorySink::new();
    export(&tl, Some(&bus), &ExportOptions::default(), &mut sink).unwrap();
    let audio = sink.config().unwrap().audio.clone().unwrap();
    assert_eq!((audio.sample_rate, audio.channels), (100, 2));
    // The temp PCM file only lives for the duration of the export.
    assert!(!audio.path.exists());
}
