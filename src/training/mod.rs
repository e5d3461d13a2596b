pub mod learner;
pub mod loss;
pub mod metrics;

pub use learner::SegmentationOutput;
pub use loss::{SegmentationCrossEntropyLoss, SegmentationCrossEntropyLossConfig};
pub use metrics::{IoUInput, IoUMetric};
