pub mod model;

#[cfg(feature = "dataset")]
pub mod dataset;

#[cfg(feature = "training")]
pub mod training;

pub use model::{Fcn8s, Fcn8sConfig};
pub use model::{EncoderFeatures, Vgg16Encoder, Vgg16EncoderConfig};

#[cfg(feature = "dataset")]
pub use dataset::{
    InputMode, SegmentationConfig, SegmentationImageItem, SegmentationImageItemRaw,
    SegmentationMode,
};

#[cfg(feature = "training")]
pub use training::{IoUMetric, SegmentationCrossEntropyLoss, SegmentationOutput};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
