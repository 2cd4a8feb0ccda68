//! Video I/O layer.
//!
//! Sources decode frames to packed RGB24; sinks append annotated frames to
//! the output stream. Both dispatch over backends:
//! - `stub://<n>` paths open a deterministic synthetic source (`n` frames)
//! - other local paths decode and encode via FFmpeg behind the
//!   `video-ffmpeg` feature
//! - without the feature, the sink falls back to a raw RGB24 dump so the
//!   pipeline stays runnable
//!
//! A source reads exactly one stream start to finish; a sink is write-once,
//! append-only, and closed by `finish`.

#[cfg(feature = "video-ffmpeg")]
mod ffmpeg;
mod synthetic;

pub use synthetic::{
    SyntheticSource, DEFAULT_STUB_FRAMES, STUB_FPS, STUB_HEIGHT, STUB_WIDTH,
};

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::frame::Frame;
use synthetic::{BufferSink, RawSink};

/// Path scheme for the synthetic source.
pub const STUB_SCHEME: &str = "stub://";

/// Stream properties reported by a source and mirrored by the sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoMeta {
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    /// Container-reported frame count; 0 when the container does not say.
    pub frame_count: u64,
}

impl VideoMeta {
    pub fn fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            self.fps_num as f64 / self.fps_den as f64
        }
    }
}

/// True when `path` names an openable demo source: a `stub://` scheme or an
/// existing local file.
pub fn source_available(path: &str) -> bool {
    path.starts_with(STUB_SCHEME) || Path::new(path).exists()
}

/// Create the output file for one run: a fresh temp file with an `.mp4`
/// suffix, persisted so it survives the process. Runs never delete their
/// output; stale files are left to the operator.
pub fn temp_output_path() -> Result<PathBuf> {
    let file = tempfile::Builder::new()
        .prefix("lotwatch-")
        .suffix(".mp4")
        .tempfile()
        .context("create temp output file")?;
    let (_, path) = file.keep().context("persist temp output file")?;
    Ok(path)
}

/// Configuration for a video source.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// Local file path or `stub://<frames>`.
    pub path: String,
}

/// Frame source for one input stream.
pub struct VideoSource {
    backend: SourceBackend,
}

enum SourceBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "video-ffmpeg")]
    Ffmpeg(ffmpeg::FfmpegSource),
}

impl VideoSource {
    pub fn open(config: SourceConfig) -> Result<Self> {
        if config.path.starts_with(STUB_SCHEME) {
            return Ok(Self {
                backend: SourceBackend::Synthetic(SyntheticSource::from_path(&config.path)),
            });
        }
        if config.path.trim().is_empty() || config.path.contains("://") {
            return Err(anyhow!(
                "video sources must be local file paths or stub:// (got '{}')",
                config.path
            ));
        }

        #[cfg(feature = "video-ffmpeg")]
        {
            Ok(Self {
                backend: SourceBackend::Ffmpeg(ffmpeg::FfmpegSource::open(config)?),
            })
        }
        #[cfg(not(feature = "video-ffmpeg"))]
        {
            Err(anyhow!(
                "decoding '{}' requires the video-ffmpeg feature",
                config.path
            ))
        }
    }

    /// Wrap a hand-built synthetic source, for tests that need control
    /// over the advertised frame count.
    pub fn synthetic(source: SyntheticSource) -> Self {
        Self {
            backend: SourceBackend::Synthetic(source),
        }
    }

    /// Stream properties, known at open time.
    pub fn meta(&self) -> VideoMeta {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.meta(),
            #[cfg(feature = "video-ffmpeg")]
            SourceBackend::Ffmpeg(source) => source.meta(),
        }
    }

    /// Decode the next frame. `Ok(None)` means the stream ended; a decode
    /// failure mid-stream counts as the end, not an error.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "video-ffmpeg")]
            SourceBackend::Ffmpeg(source) => source.next_frame(),
        }
    }
}

/// Configuration for a video sink.
#[derive(Clone, Debug)]
pub struct SinkConfig {
    pub path: PathBuf,
    /// Output mirrors the source's resolution and frame rate.
    pub meta: VideoMeta,
    /// Encoder bit rate in bits per second.
    pub bit_rate: usize,
}

/// Frame sink for one output stream.
pub struct VideoSink {
    backend: SinkBackend,
}

enum SinkBackend {
    Raw(RawSink),
    Buffer(BufferSink),
    #[cfg(feature = "video-ffmpeg")]
    Ffmpeg(ffmpeg::FfmpegSink),
}

impl VideoSink {
    /// Create the on-disk sink for a run. With `video-ffmpeg` this encodes
    /// an MP4 (MPEG-4 Part 2, "mp4v"); without it, raw RGB24 frames are
    /// appended to the path as a stand-in.
    pub fn create(config: SinkConfig) -> Result<Self> {
        #[cfg(feature = "video-ffmpeg")]
        {
            Ok(Self {
                backend: SinkBackend::Ffmpeg(ffmpeg::FfmpegSink::create(&config)?),
            })
        }
        #[cfg(not(feature = "video-ffmpeg"))]
        {
            log::warn!(
                "video-ffmpeg feature disabled, writing raw RGB24 frames to {}",
                config.path.display()
            );
            Ok(Self {
                backend: SinkBackend::Raw(RawSink::create(&config)?),
            })
        }
    }

    /// In-memory sink retaining every written frame, for tests.
    pub fn buffer() -> Self {
        Self {
            backend: SinkBackend::Buffer(BufferSink::new()),
        }
    }

    /// Append one frame to the output.
    pub fn write(&mut self, frame: &Frame) -> Result<()> {
        match &mut self.backend {
            SinkBackend::Raw(sink) => sink.write(frame),
            SinkBackend::Buffer(sink) => sink.write(frame),
            #[cfg(feature = "video-ffmpeg")]
            SinkBackend::Ffmpeg(sink) => sink.write(frame),
        }
    }

    /// Flush and close the output stream. Idempotent.
    pub fn finish(&mut self) -> Result<()> {
        match &mut self.backend {
            SinkBackend::Raw(sink) => sink.finish(),
            SinkBackend::Buffer(_) => Ok(()),
            #[cfg(feature = "video-ffmpeg")]
            SinkBackend::Ffmpeg(sink) => sink.finish(),
        }
    }

    pub fn frames_written(&self) -> u64 {
        match &self.backend {
            SinkBackend::Raw(sink) => sink.frames_written(),
            SinkBackend::Buffer(sink) => sink.frames_written(),
            #[cfg(feature = "video-ffmpeg")]
            SinkBackend::Ffmpeg(sink) => sink.frames_written(),
        }
    }

    /// Output path for on-disk sinks; `None` for the buffer sink.
    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            SinkBackend::Raw(sink) => Some(sink.path()),
            SinkBackend::Buffer(_) => None,
            #[cfg(feature = "video-ffmpeg")]
            SinkBackend::Ffmpeg(sink) => Some(sink.path()),
        }
    }

    /// Frames retained by a buffer sink; empty for on-disk sinks.
    pub fn take_frames(self) -> Vec<Frame> {
        match self.backend {
            SinkBackend::Buffer(sink) => sink.take_frames(),
            _ => Vec::new(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
