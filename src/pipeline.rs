//! The per-frame annotation loop.
//!
//! One run reads a source start to finish: decode, infer, draw, append to
//! the sink, report to the observer. Each frame is fully processed before
//! the next begins; there is no parallelism inside the loop and no
//! cancellation once started. The loop is bounded by the container's
//! reported frame count and stops early when the source ends first.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::annotate;
use crate::detect::DetectorBackend;
use crate::frame::Frame;
use crate::video::{VideoMeta, VideoSink, VideoSource};

/// Observer over a single run's lifecycle. Default bodies are no-ops.
pub trait RunObserver {
    /// The run is about to process its first frame.
    fn on_start(&mut self, _meta: &VideoMeta) {}

    /// Frame `index` (1-based) of `total` has been fully processed; `frame`
    /// is the annotated frame just written. Progress is `index / total`.
    fn on_frame(&mut self, _index: u64, _total: u64, _frame: &Frame) {}

    /// The run finished normally.
    fn on_complete(&mut self, _summary: &RunSummary) {}
}

/// Observer that ignores everything.
pub struct NullObserver;

impl RunObserver for NullObserver {}

/// What one run did.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub frames_read: u64,
    pub frames_written: u64,
    pub detections: u64,
    /// Output path for on-disk sinks.
    pub output: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Run the annotation loop over a whole source.
///
/// The sink is finalized before returning on the success path; a hard
/// error from inference or the sink aborts the run and propagates.
pub fn run(
    source: &mut VideoSource,
    sink: &mut VideoSink,
    detector: &mut dyn DetectorBackend,
    observer: &mut dyn RunObserver,
) -> Result<RunSummary> {
    let started = Instant::now();
    let meta = source.meta();
    log::info!(
        "run started: {}x{} @ {:.2} fps, {} frames reported, backend {}",
        meta.width,
        meta.height,
        meta.fps(),
        meta.frame_count,
        detector.name()
    );

    detector.warm_up().context("detector warm-up failed")?;
    observer.on_start(&meta);

    let total = meta.frame_count;
    let mut frames_read = 0u64;
    let mut detections_total = 0u64;

    for index in 1..=total {
        let Some(mut frame) = source.next_frame()? else {
            log::warn!(
                "source ended after {} of {} reported frames",
                frames_read,
                total
            );
            break;
        };
        frames_read += 1;

        let detections = detector.detect(&frame).context("inference failed")?;
        detections_total += detections.len() as u64;

        annotate::annotate_frame(&mut frame, &detections);
        sink.write(&frame).context("write annotated frame")?;
        observer.on_frame(index, total, &frame);
    }

    sink.finish().context("finalize output stream")?;

    let summary = RunSummary {
        frames_read,
        frames_written: sink.frames_written(),
        detections: detections_total,
        output: sink.path().map(|p| p.to_path_buf()),
        elapsed: started.elapsed(),
    };
    log::info!(
        "run complete: {} frames, {} detections, {:?}",
        summary.frames_written,
        summary.detections,
        summary.elapsed
    );
    observer.on_complete(&summary);
    Ok(summary)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::StubBackend;
    use crate::video::{SourceConfig, SyntheticSource};

    struct Recording {
        started: Option<VideoMeta>,
        progress: Vec<f32>,
        completed: bool,
    }

    impl Recording {
        fn new() -> Self {
            Self {
                started: None,
                progress: Vec::new(),
                completed: false,
            }
        }
    }

    impl RunObserver for Recording {
        fn on_start(&mut self, meta: &VideoMeta) {
            self.started = Some(*meta);
        }

        fn on_frame(&mut self, index: u64, total: u64, _frame: &Frame) {
            self.progress.push(index as f32 / total as f32);
        }

        fn on_complete(&mut self, _summary: &RunSummary) {
            self.completed = true;
        }
    }

    #[test]
    fn processes_every_reported_frame() {
        let mut source = VideoSource::open(SourceConfig {
            path: "stub://10".to_string(),
        })
        .unwrap();
        let mut sink = VideoSink::buffer();
        let mut detector = StubBackend::constant("Occupied", 0.87);
        let mut observer = Recording::new();

        let summary = run(&mut source, &mut sink, &mut detector, &mut observer).unwrap();

        assert_eq!(summary.frames_read, 10);
        assert_eq!(summary.frames_written, 10);
        assert_eq!(summary.detections, 10);
        assert!(summary.output.is_none());
        assert!(observer.completed);
        assert_eq!(observer.started.unwrap().frame_count, 10);

        // Progress climbs 0.1, 0.2, ..., 1.0.
        assert_eq!(observer.progress.len(), 10);
        for (i, p) in observer.progress.iter().enumerate() {
            let expected = (i as f32 + 1.0) / 10.0;
            assert!((p - expected).abs() < 1e-6, "step {}: {} != {}", i, p, expected);
        }
        assert_eq!(*observer.progress.last().unwrap(), 1.0);
    }

    #[test]
    fn early_source_end_is_success_with_partial_progress() {
        let mut source = VideoSource::synthetic(SyntheticSource::with_counts(6, 10));
        let mut sink = VideoSink::buffer();
        let mut detector = StubBackend::constant("Occupied", 0.5);
        let mut observer = Recording::new();

        let summary = run(&mut source, &mut sink, &mut detector, &mut observer).unwrap();

        assert_eq!(summary.frames_read, 6);
        assert_eq!(summary.frames_written, 6);
        assert!(observer.completed);
        assert!((observer.progress.last().unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn zero_reported_frames_processes_nothing() {
        let mut source = VideoSource::open(SourceConfig {
            path: "stub://0".to_string(),
        })
        .unwrap();
        let mut sink = VideoSink::buffer();
        let mut detector = StubBackend::new();
        let mut observer = Recording::new();

        let summary = run(&mut source, &mut sink, &mut detector, &mut observer).unwrap();
        assert_eq!(summary.frames_written, 0);
        assert!(observer.progress.is_empty());
        assert!(observer.completed);
    }

    #[test]
    fn written_frames_carry_the_annotation() {
        let mut source = VideoSource::open(SourceConfig {
            path: "stub://3".to_string(),
        })
        .unwrap();
        let mut sink = VideoSink::buffer();
        let mut detector = StubBackend::constant("Occupied", 0.87);
        let mut observer = NullObserver;

        run(&mut source, &mut sink, &mut detector, &mut observer).unwrap();

        let frames = sink.take_frames();
        assert_eq!(frames.len(), 3);
        for frame in &frames {
            // Stub box top-left corner sits at (w/4, h/4) in the occupied color.
            let x = frame.width() / 4;
            let y = frame.height() / 4;
            assert_eq!(frame.pixel(x, y), crate::annotate::COLOR_OCCUPIED);
        }
    }
}
