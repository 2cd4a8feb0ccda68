use anyhow::Result;
use tempfile::tempdir;

use lotwatch::pipeline;
use lotwatch::{
    temp_output_path, NullObserver, SinkConfig, SourceConfig, StubBackend, VideoSink, VideoSource,
};

#[test]
fn stub_source_to_sink_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let out = dir.path().join("processed.out");

    let mut source = VideoSource::open(SourceConfig {
        path: "stub://8".to_string(),
    })?;
    let meta = source.meta();
    assert_eq!(meta.frame_count, 8);
    assert_eq!((meta.width, meta.height), (640, 480));

    let mut sink = VideoSink::create(SinkConfig {
        path: out.clone(),
        meta,
        bit_rate: 4_000_000,
    })?;
    let mut detector = StubBackend::constant("occupied", 0.87);
    let mut observer = NullObserver;

    let summary = pipeline::run(&mut source, &mut sink, &mut detector, &mut observer)?;

    assert_eq!(summary.frames_read, 8);
    assert_eq!(summary.frames_written, 8);
    assert_eq!(summary.detections, 8);
    assert_eq!(summary.output.as_deref(), Some(out.as_path()));

    // Without an encoder feature the sink stores packed RGB24.
    let bytes = std::fs::metadata(&out)?.len();
    assert_eq!(bytes, 8 * 640 * 480 * 3);

    Ok(())
}

#[test]
fn temp_output_is_kept_on_disk() -> Result<()> {
    let path = temp_output_path()?;
    assert!(path.exists());

    let name = path
        .file_name()
        .expect("temp file name")
        .to_string_lossy()
        .to_string();
    assert!(name.starts_with("lotwatch-"));
    assert!(name.ends_with(".mp4"));

    std::fs::remove_file(&path)?;
    Ok(())
}
