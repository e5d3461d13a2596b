mod blocks;
mod fcn;
mod vgg;

pub use blocks::{
    ConvStack, ConvStackConfig, FuseBlock, FuseBlockConfig, ScoreBlock, ScoreBlockConfig,
};

pub use fcn::{Fcn8s, Fcn8sConfig};
pub use vgg::{EncoderFeatures, Vgg16Encoder, Vgg16EncoderConfig};
