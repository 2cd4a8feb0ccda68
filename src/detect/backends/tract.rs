#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::preprocess::{letterbox_frame, Letterbox};
use crate::detect::result::{apply_nms, Detection};
use crate::frame::Frame;

/// Square model input side used when none is configured.
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Tract-based backend for ONNX detection models.
///
/// Loads a local model file and runs it on letterboxed RGB frames. The
/// output is expected in the single-tensor YOLO layout
/// `[1, 4 + classes, anchors]`: center-form boxes in rows 0..4 and one
/// class-score row per configured label.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: u32,
    labels: Vec<String>,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32, labels: Vec<String>) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            labels,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
        })
    }

    /// Override the default confidence and IoU thresholds.
    pub fn with_thresholds(mut self, confidence: f32, iou: f32) -> Self {
        self.confidence_threshold = confidence;
        self.iou_threshold = iou;
        self
    }

    fn build_input(&self, pixels: &[u8]) -> Result<Tensor> {
        let side = self.input_size as usize;
        let expected_len = side
            .checked_mul(side)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("model input dimensions overflow"))?;

        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let input =
            tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
                let idx = (y * side + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            });

        Ok(input.into_tensor())
    }

    fn decode_output(
        &self,
        outputs: TVec<TValue>,
        lb: &Letterbox,
        src_w: u32,
        src_h: u32,
    ) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let shape = view.shape();
        let rows = 4 + self.labels.len();
        if shape.len() != 3 || shape[0] != 1 || shape[1] != rows {
            return Err(anyhow!(
                "unexpected model output shape {:?}, expected [1, {}, anchors]",
                shape,
                rows
            ));
        }
        let anchors = shape[2];

        let mut candidates = Vec::new();
        for anchor in 0..anchors {
            let mut best_class = 0usize;
            let mut best_score = f32::NEG_INFINITY;
            for (class, _) in self.labels.iter().enumerate() {
                let score = view[[0, 4 + class, anchor]];
                if score > best_score {
                    best_score = score;
                    best_class = class;
                }
            }
            if best_score < self.confidence_threshold {
                continue;
            }

            let cx = view[[0, 0, anchor]];
            let cy = view[[0, 1, anchor]];
            let w = view[[0, 2, anchor]];
            let h = view[[0, 3, anchor]];

            let x1 = lb.unmap_x(cx - w / 2.0).clamp(0.0, src_w as f32);
            let y1 = lb.unmap_y(cy - h / 2.0).clamp(0.0, src_h as f32);
            let x2 = lb.unmap_x(cx + w / 2.0).clamp(0.0, src_w as f32);
            let y2 = lb.unmap_y(cy + h / 2.0).clamp(0.0, src_h as f32);

            candidates.push(Detection::new(
                x1,
                y1,
                x2,
                y2,
                best_score,
                &self.labels[best_class],
            ));
        }

        Ok(apply_nms(candidates, self.iou_threshold))
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let (canvas, lb) = letterbox_frame(frame, self.input_size)?;
        let input = self.build_input(&canvas)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode_output(outputs, &lb, frame.width(), frame.height())
    }
}
