//! Parking-spot detection video demo.
//!
//! Runs a pretrained object detector over a parking-lot video, draws the
//! detections onto every frame, and re-encodes the result as an MP4 next
//! to a small web page that shows progress live and offers the processed
//! file for download.
//!
//! # Module Structure
//!
//! - `frame`: packed RGB frame buffer and JPEG encoding
//! - `video`: decoding sources and encoding sinks (ffmpeg behind the
//!   `video-ffmpeg` feature, a synthetic source for tests)
//! - `detect`: detector backends, letterbox preprocessing, NMS
//! - `annotate`: bounding boxes and labels drawn into frames
//! - `pipeline`: the per-frame decode, detect, annotate, encode loop
//! - `web`: the demo page and its HTTP plumbing
//! - `config`: defaults, JSON config file, environment overrides

pub mod annotate;
pub mod config;
pub mod detect;
pub mod frame;
pub mod pipeline;
pub mod video;
pub mod web;

pub use annotate::annotate_frame;
pub use config::DemoConfig;
pub use detect::{apply_nms, filter_by_confidence, iou, Detection, DetectorBackend, StubBackend};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use frame::Frame;
pub use pipeline::{NullObserver, RunObserver, RunSummary};
pub use video::{
    source_available, temp_output_path, SinkConfig, SourceConfig, VideoMeta, VideoSink,
    VideoSource,
};
pub use web::{DemoHandle, DemoServer, RunPhase, SharedState};
