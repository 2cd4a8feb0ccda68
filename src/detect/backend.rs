use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend wraps one loaded model (or stand-in) and turns a frame into
/// zero or more detections in source-frame pixel coordinates. `detect`
/// takes `&mut self` so backends may keep model state (planners, scratch
/// buffers, the stub's previous-frame hash) between calls.
pub trait DetectorBackend: Send {
    /// Backend identifier for logs and summaries.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// Implementations must treat the frame as read-only; annotation
    /// happens after this call, on the pipeline's copy.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
