use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Default label for stub detections.
pub const DEFAULT_STUB_LABEL: &str = "occupied";

/// Default confidence for stub detections.
pub const DEFAULT_STUB_CONFIDENCE: f32 = 0.85;

/// Stand-in backend for builds without a real model. Hashes each frame's
/// pixels; when the hash differs from the previous frame's it reports one
/// detection covering the central half of the frame.
pub struct StubBackend {
    label: String,
    confidence: f32,
    every_frame: bool,
    last_hash: Option<[u8; 32]>,
}

impl StubBackend {
    /// Motion-gated stub: quiet on the first frame and on repeated frames.
    pub fn new() -> Self {
        Self {
            label: DEFAULT_STUB_LABEL.to_string(),
            confidence: DEFAULT_STUB_CONFIDENCE,
            every_frame: false,
            last_hash: None,
        }
    }

    /// Stub that emits its detection on every frame regardless of content.
    pub fn constant(label: &str, confidence: f32) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            every_frame: true,
            last_hash: None,
        }
    }

    /// Override the emitted label.
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// One box inset by a quarter of the frame on every side.
    fn center_box(&self, width: u32, height: u32) -> Detection {
        let w = width as f32;
        let h = height as f32;
        Detection::new(
            w / 4.0,
            h / 4.0,
            w * 3.0 / 4.0,
            h * 3.0 / 4.0,
            self.confidence,
            &self.label,
        )
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let current_hash: [u8; 32] = Sha256::digest(frame.data()).into();

        let changed = match self.last_hash {
            Some(prev) => prev != current_hash,
            None => false,
        };

        self.last_hash = Some(current_hash);

        if self.every_frame || changed {
            Ok(vec![self.center_box(frame.width(), frame.height())])
        } else {
            Ok(vec![])
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
