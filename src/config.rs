use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_VIDEO_PATH: &str = "parking.mp4";
const DEFAULT_MODEL_PATH: &str = "best.onnx";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8750";
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_JPEG_QUALITY: u8 = 80;
const DEFAULT_BIT_RATE: usize = 4_000_000;

fn default_labels() -> Vec<String> {
    vec!["empty".to_string(), "occupied".to_string()]
}

#[derive(Debug, Deserialize, Default)]
struct DemoConfigFile {
    video_path: Option<String>,
    model_path: Option<String>,
    labels: Option<Vec<String>>,
    detection: Option<DetectionConfigFile>,
    server: Option<ServerConfigFile>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ServerConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    jpeg_quality: Option<u8>,
    bit_rate: Option<usize>,
}

/// Resolved demo configuration: defaults, then the JSON config file named
/// by `LOTWATCH_CONFIG`, then `LOTWATCH_*` environment overrides.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Input video the demo processes.
    pub video_path: String,
    /// ONNX detection model weights.
    pub model_path: String,
    /// Class names in model output order.
    pub labels: Vec<String>,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    /// Address the demo page is served on.
    pub listen_addr: String,
    /// JPEG quality for the live frame view, 1..=100.
    pub jpeg_quality: u8,
    /// Encoder bit rate for the processed video, bits per second.
    pub bit_rate: usize,
}

impl DemoConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("LOTWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: DemoConfigFile) -> Self {
        Self {
            video_path: file
                .video_path
                .unwrap_or_else(|| DEFAULT_VIDEO_PATH.to_string()),
            model_path: file
                .model_path
                .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string()),
            labels: file.labels.unwrap_or_else(default_labels),
            confidence_threshold: file
                .detection
                .as_ref()
                .and_then(|d| d.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            iou_threshold: file
                .detection
                .as_ref()
                .and_then(|d| d.iou_threshold)
                .unwrap_or(DEFAULT_IOU_THRESHOLD),
            listen_addr: file
                .server
                .and_then(|server| server.addr)
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            jpeg_quality: file
                .output
                .as_ref()
                .and_then(|output| output.jpeg_quality)
                .unwrap_or(DEFAULT_JPEG_QUALITY),
            bit_rate: file
                .output
                .and_then(|output| output.bit_rate)
                .unwrap_or(DEFAULT_BIT_RATE),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("LOTWATCH_VIDEO") {
            if !path.trim().is_empty() {
                self.video_path = path;
            }
        }
        if let Ok(path) = std::env::var("LOTWATCH_MODEL") {
            if !path.trim().is_empty() {
                self.model_path = path;
            }
        }
        if let Ok(labels) = std::env::var("LOTWATCH_LABELS") {
            let parsed = split_csv(&labels);
            if !parsed.is_empty() {
                self.labels = parsed;
            }
        }
        if let Ok(addr) = std::env::var("LOTWATCH_ADDR") {
            if !addr.trim().is_empty() {
                self.listen_addr = addr;
            }
        }
        if let Ok(threshold) = std::env::var("LOTWATCH_CONF_THRESHOLD") {
            self.confidence_threshold = threshold
                .parse()
                .map_err(|_| anyhow!("LOTWATCH_CONF_THRESHOLD must be a number"))?;
        }
        if let Ok(threshold) = std::env::var("LOTWATCH_IOU_THRESHOLD") {
            self.iou_threshold = threshold
                .parse()
                .map_err(|_| anyhow!("LOTWATCH_IOU_THRESHOLD must be a number"))?;
        }
        if let Ok(quality) = std::env::var("LOTWATCH_JPEG_QUALITY") {
            self.jpeg_quality = quality
                .parse()
                .map_err(|_| anyhow!("LOTWATCH_JPEG_QUALITY must be an integer"))?;
        }
        if let Ok(bit_rate) = std::env::var("LOTWATCH_BIT_RATE") {
            self.bit_rate = bit_rate
                .parse()
                .map_err(|_| anyhow!("LOTWATCH_BIT_RATE must be an integer"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.video_path.trim().is_empty() {
            return Err(anyhow!("video_path must not be empty"));
        }
        if self.labels.is_empty() || self.labels.iter().any(|l| l.trim().is_empty()) {
            return Err(anyhow!("labels must be a non-empty list of non-empty names"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(anyhow!("confidence_threshold must be within 0.0..=1.0"));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(anyhow!("iou_threshold must be within 0.0..=1.0"));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(anyhow!("jpeg_quality must be within 1..=100"));
        }
        if self.bit_rate == 0 {
            return Err(anyhow!("bit_rate must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self::from_file(DemoConfigFile::default())
    }
}

fn read_config_file(path: &Path) -> Result<DemoConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
