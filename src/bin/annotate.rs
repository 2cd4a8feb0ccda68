//! annotate - run parking-spot detection over a video from the command line

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use lotwatch::frame::Frame;
use lotwatch::pipeline::{self, RunObserver};
use lotwatch::{
    detect, source_available, temp_output_path, DemoConfig, SinkConfig, SourceConfig, VideoSink,
    VideoSource,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input video to process (overrides the configured path).
    #[arg(long)]
    video: Option<String>,
    /// ONNX model weights for the detector.
    #[arg(long)]
    model: Option<String>,
    /// Where to write the processed video; a kept temp file when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Class names in model output order, comma separated.
    #[arg(long, value_delimiter = ',')]
    labels: Option<Vec<String>>,
    /// Minimum confidence for kept detections.
    #[arg(long)]
    confidence: Option<f32>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE", env = "LOTWATCH_UI")]
    ui: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let mut config = DemoConfig::load()?;
    if let Some(video) = args.video {
        config.video_path = video;
    }
    if let Some(model) = args.model {
        config.model_path = model;
    }
    if let Some(labels) = args.labels {
        config.labels = labels;
    }
    if let Some(confidence) = args.confidence {
        config.confidence_threshold = confidence;
    }

    if !source_available(&config.video_path) {
        return Err(anyhow!(
            "Video file {} not found in working directory.",
            config.video_path
        ));
    }

    let mut source = {
        let _stage = ui.stage("Open video");
        VideoSource::open(SourceConfig {
            path: config.video_path.clone(),
        })?
    };
    let meta = source.meta();

    let output = match args.output {
        Some(path) => path,
        None => temp_output_path()?,
    };
    let mut sink = {
        let _stage = ui.stage("Create output video");
        VideoSink::create(SinkConfig {
            path: output.clone(),
            meta,
            bit_rate: config.bit_rate,
        })?
    };
    let mut detector = {
        let _stage = ui.stage("Load detector");
        detect::from_config(&config)?
    };

    let bar = ui.progress("Annotate frames", meta.frame_count);
    let mut observer = BarObserver { bar: &bar };
    let summary = pipeline::run(&mut source, &mut sink, detector.as_mut(), &mut observer)?;
    drop(bar);

    println!("annotate summary:");
    println!("  frames processed: {}", summary.frames_read);
    println!("  frames written: {}", summary.frames_written);
    println!("  detections drawn: {}", summary.detections);
    println!("  elapsed: {:.2}s", summary.elapsed.as_secs_f64());
    println!("  output: {}", output.display());
    Ok(())
}

struct BarObserver<'a> {
    bar: &'a ui::ProgressGuard,
}

impl RunObserver for BarObserver<'_> {
    fn on_frame(&mut self, index: u64, _total: u64, _frame: &Frame) {
        self.bar.set(index);
    }
}
