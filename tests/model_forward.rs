use burn::backend::{Autodiff, NdArray};
use burn::prelude::*;
use burn::train::TrainStep;

use burn_fcn::dataset::SegmentationBatch;
use burn_fcn::{Fcn8sConfig, Vgg16EncoderConfig};

type B = NdArray<f32>;

#[test]
fn encoder_taps_have_expected_strides_and_channels() {
    let device = Default::default();
    let encoder = Vgg16EncoderConfig::new(3)
        .with_base_channels(4)
        .with_fc_channels(8)
        .init::<B>(&device);

    let input = Tensor::<B, 4>::zeros([1, 3, 32, 64], &device);
    let features = encoder.forward(input);

    assert_eq!(features.pool3.dims(), [1, 16, 4, 8]);
    assert_eq!(features.pool4.dims(), [1, 32, 2, 4]);
    assert_eq!(features.conv7.dims(), [1, 8, 1, 2]);
}

#[test]
fn logits_match_input_resolution() {
    let device = Default::default();
    let model = Fcn8sConfig::new()
        .with_base_channels(4)
        .with_fc_channels(8)
        .with_num_classes(2)
        .init::<B>(&device);

    let input = Tensor::<B, 4>::zeros([2, 3, 32, 64], &device);
    let logits = model.forward(input);

    assert_eq!(logits.dims(), [2, 2, 32, 64]);
}

#[test]
fn multiclass_head_widens_logit_channels() {
    let device = Default::default();
    let model = Fcn8sConfig::new()
        .with_base_channels(4)
        .with_fc_channels(8)
        .with_num_classes(5)
        .init::<B>(&device);

    let input = Tensor::<B, 4>::zeros([1, 3, 32, 32], &device);
    let logits = model.forward(input);

    assert_eq!(logits.dims(), [1, 5, 32, 32]);
}

#[test]
fn train_step_produces_finite_loss_and_gradients() {
    type AB = Autodiff<B>;

    let device = Default::default();
    let model = Fcn8sConfig::new()
        .with_base_channels(4)
        .with_fc_channels(8)
        .with_num_classes(2)
        .init::<AB>(&device);

    let batch = SegmentationBatch {
        images: Tensor::<AB, 4>::ones([1, 3, 32, 32], &device),
        masks: Tensor::<AB, 4, Int>::zeros([1, 1, 32, 32], &device),
    };

    let output = TrainStep::step(&model, batch);

    assert_eq!(output.item.output.dims(), [1, 2, 32, 32]);
    let loss = output.item.loss.into_scalar().elem::<f32>();
    assert!(loss.is_finite(), "got {loss}");
}

#[test]
#[should_panic(expected = "multiples of 32")]
fn rejects_input_not_divisible_by_32() {
    let device = Default::default();
    let model = Fcn8sConfig::new()
        .with_base_channels(4)
        .with_fc_channels(8)
        .init::<B>(&device);

    let input = Tensor::<B, 4>::zeros([1, 3, 30, 50], &device);
    let _ = model.forward(input);
}
