mod segmentation;

pub use segmentation::{
    InputMode, SegmentationBatch, SegmentationBatcher, SegmentationConfig, SegmentationImageItem,
    SegmentationImageItemRaw, SegmentationMode,
};
