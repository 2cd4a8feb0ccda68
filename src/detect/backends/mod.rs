pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::StubBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;

use anyhow::Result;

use crate::config::DemoConfig;
use crate::detect::backend::DetectorBackend;

/// Build the detector the demo runs with.
///
/// With `backend-tract` this loads the configured ONNX model; otherwise it
/// falls back to the stub so the pipeline stays runnable end to end.
pub fn from_config(config: &DemoConfig) -> Result<Box<dyn DetectorBackend>> {
    #[cfg(feature = "backend-tract")]
    {
        let backend = TractBackend::new(
            &config.model_path,
            tract::DEFAULT_INPUT_SIZE,
            config.labels.clone(),
        )?
        .with_thresholds(config.confidence_threshold, config.iou_threshold);
        Ok(Box::new(backend))
    }

    #[cfg(not(feature = "backend-tract"))]
    {
        log::info!("backend-tract feature disabled, using stub detector");
        let label = config
            .labels
            .iter()
            .find(|l| l.eq_ignore_ascii_case(stub::DEFAULT_STUB_LABEL))
            .cloned()
            .unwrap_or_else(|| stub::DEFAULT_STUB_LABEL.to_string());
        Ok(Box::new(StubBackend::new().with_label(&label)))
    }
}
