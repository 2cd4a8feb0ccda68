//! Synthetic source and stand-in sinks.
//!
//! The synthetic source backs `stub://` paths: a fixed-size stream of
//! deterministic frames with a block sliding across a flat background, so
//! consecutive frames always differ. It exists for tests and for builds
//! without FFmpeg.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::frame::Frame;
use crate::video::{SinkConfig, VideoMeta, STUB_SCHEME};

/// Frames a `stub://` source yields when the path names no count.
pub const DEFAULT_STUB_FRAMES: u64 = 50;

pub const STUB_WIDTH: u32 = 640;
pub const STUB_HEIGHT: u32 = 480;
pub const STUB_FPS: u32 = 10;

const BLOCK_SIDE: i32 = 64;
const BLOCK_STEP: i32 = 8;
const BACKGROUND: [u8; 3] = [32, 32, 32];
const BLOCK: [u8; 3] = [220, 220, 220];

/// Deterministic frame source for `stub://` paths.
pub struct SyntheticSource {
    produced: u64,
    /// Frames actually yielded before end of stream.
    limit: u64,
    /// Frame count advertised in the stream meta.
    advertised: u64,
}

impl SyntheticSource {
    /// Parse a `stub://<frames>` path; a non-numeric suffix yields
    /// `DEFAULT_STUB_FRAMES`.
    pub fn from_path(path: &str) -> Self {
        let frames = path
            .strip_prefix(STUB_SCHEME)
            .and_then(|suffix| suffix.parse::<u64>().ok())
            .unwrap_or(DEFAULT_STUB_FRAMES);
        Self::new(frames)
    }

    pub fn new(frames: u64) -> Self {
        Self {
            produced: 0,
            limit: frames,
            advertised: frames,
        }
    }

    /// Source that advertises `advertised` frames but ends after `actual`,
    /// for exercising early end-of-stream handling.
    pub fn with_counts(actual: u64, advertised: u64) -> Self {
        Self {
            produced: 0,
            limit: actual,
            advertised,
        }
    }

    pub fn meta(&self) -> VideoMeta {
        VideoMeta {
            width: STUB_WIDTH,
            height: STUB_HEIGHT,
            fps_num: STUB_FPS,
            fps_den: 1,
            frame_count: self.advertised,
        }
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.produced >= self.limit {
            return Ok(None);
        }
        let frame = generate_frame(self.produced);
        self.produced += 1;
        Ok(Some(frame))
    }
}

fn generate_frame(index: u64) -> Frame {
    let mut frame = Frame::filled(STUB_WIDTH, STUB_HEIGHT, BACKGROUND);
    let travel = STUB_WIDTH as i32 - BLOCK_SIDE;
    let x0 = (index as i32 * BLOCK_STEP) % travel;
    let y0 = (STUB_HEIGHT as i32 - BLOCK_SIDE) / 2;
    for y in y0..y0 + BLOCK_SIDE {
        for x in x0..x0 + BLOCK_SIDE {
            frame.put_rgb(x, y, BLOCK);
        }
    }
    frame
}

// ----------------------------------------------------------------------------
// Stand-in sinks
// ----------------------------------------------------------------------------

/// On-disk sink for builds without FFmpeg: appends packed RGB24 frames to
/// the output path. Not a playable container; it keeps the run's file
/// side effects observable.
pub(crate) struct RawSink {
    writer: BufWriter<File>,
    path: PathBuf,
    frames_written: u64,
}

impl RawSink {
    pub(crate) fn create(config: &SinkConfig) -> Result<Self> {
        let file = File::create(&config.path)
            .with_context(|| format!("create output file {}", config.path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: config.path.clone(),
            frames_written: 0,
        })
    }

    pub(crate) fn write(&mut self, frame: &Frame) -> Result<()> {
        self.writer
            .write_all(frame.data())
            .context("append raw frame to output file")?;
        self.frames_written += 1;
        Ok(())
    }

    pub(crate) fn finish(&mut self) -> Result<()> {
        self.writer.flush().context("flush raw output file")
    }

    pub(crate) fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

/// In-memory sink retaining every written frame for assertions.
pub(crate) struct BufferSink {
    frames: Vec<Frame>,
}

impl BufferSink {
    pub(crate) fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub(crate) fn write(&mut self, frame: &Frame) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    pub(crate) fn frames_written(&self) -> u64 {
        self.frames.len() as u64
    }

    pub(crate) fn take_frames(self) -> Vec<Frame> {
        self.frames
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
