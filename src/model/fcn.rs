use std::path::Path;

use burn::{
    nn::{
        Initializer,
        conv::{ConvTranspose2d, ConvTranspose2dConfig},
    },
    prelude::*,
    record::RecorderError,
};

#[cfg(feature = "training")]
use crate::{
    dataset::SegmentationBatch,
    training::{SegmentationOutput, loss::SegmentationCrossEntropyLossConfig},
};
#[cfg(feature = "training")]
use burn::{
    tensor::backend::AutodiffBackend,
    train::{TrainOutput, TrainStep, ValidStep},
};

use super::blocks::{FuseBlock, FuseBlockConfig, ScoreBlock, ScoreBlockConfig};
use super::vgg::{Vgg16Encoder, Vgg16EncoderConfig};

/// Fully convolutional network with 8-pixel output stride.
///
/// A VGG-16 encoder is tapped at pool3, pool4, and conv7; each tap is
/// projected to class scores with a 1x1 convolution, the coarser scores are
/// upsampled by learned transposed convolutions and fused with the finer
/// taps by element-wise addition, and a final stride-8 transposed
/// convolution restores the input resolution.
#[derive(Module, Debug)]
pub struct Fcn8s<B: Backend> {
    encoder: Vgg16Encoder<B>,
    score_conv7: ScoreBlock<B>,
    score_pool4: ScoreBlock<B>,
    score_pool3: ScoreBlock<B>,
    fuse_pool4: FuseBlock<B>,
    fuse_pool3: FuseBlock<B>,
    upsample: ConvTranspose2d<B>,

    num_classes: usize,
}

#[derive(Config, Debug)]
pub struct Fcn8sConfig {
    #[config(default = "3")]
    input_channels: usize,
    #[config(default = "2")]
    num_classes: usize,
    #[config(default = "64")]
    base_channels: usize,
    #[config(default = "4096")]
    fc_channels: usize,
    #[config(default = "0.35")]
    dropout: f64,
}

impl Fcn8sConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Fcn8s<B> {
        let encoder = Vgg16EncoderConfig::new(self.input_channels)
            .with_base_channels(self.base_channels)
            .with_fc_channels(self.fc_channels)
            .with_dropout(self.dropout);

        Fcn8s {
            score_conv7: ScoreBlockConfig::new(encoder.conv7_channels(), self.num_classes)
                .init(device),
            score_pool4: ScoreBlockConfig::new(encoder.pool4_channels(), self.num_classes)
                .init(device),
            score_pool3: ScoreBlockConfig::new(encoder.pool3_channels(), self.num_classes)
                .init(device),
            fuse_pool4: FuseBlockConfig::new(self.num_classes).init(device),
            fuse_pool3: FuseBlockConfig::new(self.num_classes).init(device),
            // kernel 16, stride 8, padding 4: output is exactly eight times
            // the input, matching the pool3 fusion stride.
            upsample: ConvTranspose2dConfig::new(
                [self.num_classes, self.num_classes],
                [16, 16],
            )
            .with_stride([8, 8])
            .with_padding([4, 4])
            .with_initializer(Initializer::Normal {
                mean: 0.0,
                std: 1e-3,
            })
            .init(device),
            encoder: encoder.init(device),
            num_classes: self.num_classes,
        }
    }
}

impl<B: Backend> Fcn8s<B> {
    /// Computes per-pixel class logits of shape
    /// `[batch, num_classes, height, width]`.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, _, height, width] = images.dims();
        assert!(
            height % 32 == 0 && width % 32 == 0,
            "input height and width must be multiples of 32, got {}x{}",
            height,
            width
        );

        let features = self.encoder.forward(images);

        let x = self.score_conv7.forward(features.conv7);
        let x = self
            .fuse_pool4
            .forward(x, self.score_pool4.forward(features.pool4));
        let x = self
            .fuse_pool3
            .forward(x, self.score_pool3.forward(features.pool3));

        self.upsample.forward(x)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Swaps the encoder weights for a pretrained record, leaving the
    /// decoder untouched.
    pub fn with_pretrained_encoder<P: AsRef<Path>>(
        mut self,
        path: P,
        device: &B::Device,
    ) -> Result<Self, RecorderError> {
        self.encoder = self.encoder.load_record_file(path, device)?;
        Ok(self)
    }

    #[cfg(feature = "training")]
    pub fn forward_segmentation(&self, item: SegmentationBatch<B>) -> SegmentationOutput<B> {
        let targets = item.masks;
        let output = self.forward(item.images);
        let valid = targets.ones_like().bool();

        let loss = SegmentationCrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone(), valid);

        SegmentationOutput {
            loss,
            output,
            targets,
        }
    }
}

#[cfg(feature = "training")]
impl<B: AutodiffBackend> TrainStep<SegmentationBatch<B>, SegmentationOutput<B>> for Fcn8s<B> {
    fn step(&self, batch: SegmentationBatch<B>) -> TrainOutput<SegmentationOutput<B>> {
        let item = self.forward_segmentation(batch);
        TrainOutput::new(self, item.loss.backward(), item)
    }
}

#[cfg(feature = "training")]
impl<B: Backend> ValidStep<SegmentationBatch<B>, SegmentationOutput<B>> for Fcn8s<B> {
    fn step(&self, batch: SegmentationBatch<B>) -> SegmentationOutput<B> {
        self.forward_segmentation(batch)
    }
}
