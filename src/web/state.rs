//! Shared state for the demo page.
//!
//! A run executes on a worker thread; request handlers and the worker
//! both go through [`SharedState`], which serializes access with a
//! mutex. One run at a time: starting while a run is active is refused.

use crate::config::DemoConfig;
use crate::detect;
use crate::frame::Frame;
use crate::pipeline::{self, RunObserver, RunSummary};
use crate::video::{self, SinkConfig, SourceConfig, VideoMeta, VideoSink, VideoSource};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running,
    Done,
    Failed,
}

#[derive(Debug)]
struct RunState {
    phase: RunPhase,
    frames_done: u64,
    total_frames: u64,
    progress: f32,
    detections: u64,
    output: Option<PathBuf>,
    error: Option<String>,
    live_jpeg: Option<Vec<u8>>,
}

impl RunState {
    fn new() -> Self {
        Self {
            phase: RunPhase::Idle,
            frames_done: 0,
            total_frames: 0,
            progress: 0.0,
            detections: 0,
            output: None,
            error: None,
            live_jpeg: None,
        }
    }
}

/// Status document served on `GET /status`; the page polls this while a
/// run is active.
#[derive(Debug, Serialize)]
struct StatusView {
    phase: RunPhase,
    progress: f32,
    frames_done: u64,
    total_frames: u64,
    detections: u64,
    output_ready: bool,
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    VideoMissing,
}

#[derive(Clone)]
pub struct SharedState {
    inner: Arc<Mutex<RunState>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RunState::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        // A worker panic must not take the page down with it.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn phase(&self) -> RunPhase {
        self.lock().phase
    }

    pub fn status_json(&self) -> Result<Vec<u8>> {
        let state = self.lock();
        let view = StatusView {
            phase: state.phase,
            progress: state.progress,
            frames_done: state.frames_done,
            total_frames: state.total_frames,
            detections: state.detections,
            output_ready: state.phase == RunPhase::Done && state.output.is_some(),
            error: state.error.clone(),
        };
        Ok(serde_json::to_vec(&view)?)
    }

    pub fn live_jpeg(&self) -> Option<Vec<u8>> {
        self.lock().live_jpeg.clone()
    }

    /// Path of the processed video, available once a run has finished.
    pub fn output_path(&self) -> Option<PathBuf> {
        let state = self.lock();
        if state.phase == RunPhase::Done {
            state.output.clone()
        } else {
            None
        }
    }

    /// Starts a run on a worker thread. Refused while another run is
    /// active or when the input video is absent.
    pub fn start_run(&self, config: &DemoConfig) -> StartOutcome {
        if !video::source_available(&config.video_path) {
            return StartOutcome::VideoMissing;
        }
        {
            let mut state = self.lock();
            if state.phase == RunPhase::Running {
                return StartOutcome::AlreadyRunning;
            }
            *state = RunState::new();
            state.phase = RunPhase::Running;
        }
        let worker_state = self.clone();
        let worker_config = config.clone();
        std::thread::spawn(move || run_worker(worker_state, worker_config));
        StartOutcome::Started
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

fn run_worker(state: SharedState, config: DemoConfig) {
    match process_video(&state, &config) {
        Ok(summary) => {
            let mut st = state.lock();
            st.phase = RunPhase::Done;
            st.frames_done = summary.frames_written;
            st.detections = summary.detections;
            st.output = summary.output;
        }
        Err(err) => {
            log::error!("video run failed: {err:#}");
            let mut st = state.lock();
            st.phase = RunPhase::Failed;
            st.error = Some(format!("{err:#}"));
        }
    }
}

fn process_video(state: &SharedState, config: &DemoConfig) -> Result<RunSummary> {
    let mut source = VideoSource::open(SourceConfig {
        path: config.video_path.clone(),
    })
    .with_context(|| format!("failed to open {}", config.video_path))?;
    let output = video::temp_output_path()?;
    let mut sink = VideoSink::create(SinkConfig {
        path: output,
        meta: source.meta(),
        bit_rate: config.bit_rate,
    })
    .context("failed to create output video")?;
    let mut detector = detect::from_config(config)?;
    let mut observer = WebObserver {
        state: state.clone(),
        jpeg_quality: config.jpeg_quality,
    };
    pipeline::run(&mut source, &mut sink, detector.as_mut(), &mut observer)
}

struct WebObserver {
    state: SharedState,
    jpeg_quality: u8,
}

impl RunObserver for WebObserver {
    fn on_start(&mut self, meta: &VideoMeta) {
        let mut st = self.state.lock();
        st.total_frames = meta.frame_count;
        st.frames_done = 0;
        st.progress = 0.0;
    }

    fn on_frame(&mut self, index: u64, total: u64, frame: &Frame) {
        let jpeg = match frame.to_jpeg(self.jpeg_quality) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::warn!("live frame encode failed: {err:#}");
                None
            }
        };
        let mut st = self.state.lock();
        st.frames_done = index;
        st.total_frames = total;
        if total > 0 {
            st.progress = index as f32 / total as f32;
        }
        if jpeg.is_some() {
            st.live_jpeg = jpeg;
        }
    }

    fn on_complete(&mut self, _summary: &RunSummary) {}
}
