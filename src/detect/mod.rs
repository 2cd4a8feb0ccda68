mod backend;
mod backends;
pub mod preprocess;
mod result;

pub use backend::DetectorBackend;
pub use backends::{from_config, StubBackend};
pub use result::{apply_nms, filter_by_confidence, iou, Detection};

#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
