use burn::{
    nn::{
        Initializer, Relu,
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
    },
    prelude::*,
};
use nn::PaddingConfig2d;

/// Standard deviation of the normal initializer used for the score and
/// upsampling layers.
const SCORE_INIT_STD: f64 = 1e-3;

#[derive(Module, Debug)]
pub struct ConvStack<B: Backend> {
    convs: Vec<Conv2d<B>>,
    activation: Relu,
}

impl<B: Backend> ConvStack<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = x;
        for conv in &self.convs {
            x = self.activation.forward(conv.forward(x));
        }
        x
    }
}

#[derive(Config, Debug)]
pub struct ConvStackConfig {
    input_channels: usize,
    num_filters: usize,
    #[config(default = "2")]
    depth: usize,
}

impl ConvStackConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvStack<B> {
        let convs = (0..self.depth)
            .map(|i| {
                let input = if i == 0 {
                    self.input_channels
                } else {
                    self.num_filters
                };
                Conv2dConfig::new([input, self.num_filters], [3, 3])
                    .with_padding(PaddingConfig2d::Same)
                    .init(device)
            })
            .collect();

        ConvStack {
            convs,
            activation: Relu::new(),
        }
    }
}

#[derive(Module, Debug)]
pub struct ScoreBlock<B: Backend> {
    conv: Conv2d<B>,
}

impl<B: Backend> ScoreBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.conv.forward(x)
    }
}

#[derive(Config, Debug)]
pub struct ScoreBlockConfig {
    input_channels: usize,
    num_classes: usize,
}

impl ScoreBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ScoreBlock<B> {
        ScoreBlock {
            conv: Conv2dConfig::new([self.input_channels, self.num_classes], [1, 1])
                .with_initializer(Initializer::Normal {
                    mean: 0.0,
                    std: SCORE_INIT_STD,
                })
                .init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct FuseBlock<B: Backend> {
    conv_transpose: ConvTranspose2d<B>,
}

impl<B: Backend> FuseBlock<B> {
    /// Upsamples `x` by a factor of two and adds the skip projection.
    pub fn forward(&self, x: Tensor<B, 4>, skip: Tensor<B, 4>) -> Tensor<B, 4> {
        self.conv_transpose.forward(x) + skip
    }
}

#[derive(Config, Debug)]
pub struct FuseBlockConfig {
    channels: usize,
}

impl FuseBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FuseBlock<B> {
        FuseBlock {
            // kernel 4, stride 2, padding 1: output is exactly twice the input.
            conv_transpose: ConvTranspose2dConfig::new([self.channels, self.channels], [4, 4])
                .with_stride([2, 2])
                .with_padding([1, 1])
                .with_initializer(Initializer::Normal {
                    mean: 0.0,
                    std: SCORE_INIT_STD,
                })
                .init(device),
        }
    }
}
