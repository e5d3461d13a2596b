use std::path::Path;

use burn::{
    nn::{
        Dropout, DropoutConfig, Relu,
        conv::{Conv2d, Conv2dConfig},
        pool::MaxPool2d,
    },
    prelude::*,
    record::{BinFileRecorder, FullPrecisionSettings, RecorderError},
};
use nn::{PaddingConfig2d, pool::MaxPool2dConfig};

use super::blocks::{ConvStack, ConvStackConfig};

/// VGG-16 feature extractor with the classifier head re-expressed as
/// convolutions (fc6 as a 7x7 convolution, fc7 as a 1x1 convolution), so
/// the network accepts arbitrary input sizes and keeps spatial layout.
#[derive(Module, Debug)]
pub struct Vgg16Encoder<B: Backend> {
    stack1: ConvStack<B>,
    stack2: ConvStack<B>,
    stack3: ConvStack<B>,
    stack4: ConvStack<B>,
    stack5: ConvStack<B>,
    pool: MaxPool2d,
    fc6: Conv2d<B>,
    fc7: Conv2d<B>,
    dropout: Dropout,
    activation: Relu,
}

/// Intermediate activations tapped for the decoder.
///
/// Spatial strides relative to the input: `pool3` is 1/8, `pool4` is 1/16,
/// `conv7` is 1/32.
#[derive(Clone, Debug)]
pub struct EncoderFeatures<B: Backend> {
    pub pool3: Tensor<B, 4>,
    pub pool4: Tensor<B, 4>,
    pub conv7: Tensor<B, 4>,
}

#[derive(Config, Debug)]
pub struct Vgg16EncoderConfig {
    input_channels: usize,
    #[config(default = "64")]
    base_channels: usize,
    #[config(default = "4096")]
    fc_channels: usize,
    #[config(default = "0.35")]
    dropout: f64,
}

impl Vgg16EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Vgg16Encoder<B> {
        Vgg16Encoder {
            stack1: ConvStackConfig::new(self.input_channels, self.base_channels).init(device),
            stack2: ConvStackConfig::new(self.base_channels, self.base_channels * 2).init(device),
            stack3: ConvStackConfig::new(self.base_channels * 2, self.base_channels * 4)
                .with_depth(3)
                .init(device),
            stack4: ConvStackConfig::new(self.base_channels * 4, self.base_channels * 8)
                .with_depth(3)
                .init(device),
            stack5: ConvStackConfig::new(self.base_channels * 8, self.base_channels * 8)
                .with_depth(3)
                .init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc6: Conv2dConfig::new([self.base_channels * 8, self.fc_channels], [7, 7])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            fc7: Conv2dConfig::new([self.fc_channels, self.fc_channels], [1, 1]).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            activation: Relu::new(),
        }
    }

    pub fn pool3_channels(&self) -> usize {
        self.base_channels * 4
    }

    pub fn pool4_channels(&self) -> usize {
        self.base_channels * 8
    }

    pub fn conv7_channels(&self) -> usize {
        self.fc_channels
    }
}

impl<B: Backend> Vgg16Encoder<B> {
    pub fn forward(&self, images: Tensor<B, 4>) -> EncoderFeatures<B> {
        let x = self.pool.forward(self.stack1.forward(images));
        let x = self.pool.forward(self.stack2.forward(x));
        let pool3 = self.pool.forward(self.stack3.forward(x));
        let pool4 = self.pool.forward(self.stack4.forward(pool3.clone()));
        let x = self.pool.forward(self.stack5.forward(pool4.clone()));

        let x = self.dropout.forward(self.activation.forward(self.fc6.forward(x)));
        let conv7 = self.dropout.forward(self.activation.forward(self.fc7.forward(x)));

        EncoderFeatures {
            pool3,
            pool4,
            conv7,
        }
    }

    /// Replaces the randomly initialized weights with a pretrained record.
    pub fn load_record_file<P: AsRef<Path>>(
        self,
        path: P,
        device: &B::Device,
    ) -> Result<Self, RecorderError> {
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        tracing::info!(
            "loading pretrained encoder weights from {}",
            path.as_ref().display()
        );
        self.load_file(path.as_ref().to_path_buf(), &recorder, device)
    }
}
