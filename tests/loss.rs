use burn::backend::NdArray;
use burn::prelude::*;

use burn_fcn::training::SegmentationCrossEntropyLossConfig;

type B = NdArray<f32>;

const LN_2: f32 = std::f32::consts::LN_2;

fn scalar(loss: Tensor<B, 1>) -> f32 {
    loss.into_scalar().elem::<f32>()
}

fn all_valid(dims: [usize; 4]) -> Tensor<B, 4, Bool> {
    let device = Default::default();
    Tensor::<B, 4, Int>::ones(dims, &device).bool()
}

#[test]
fn uniform_logits_cost_ln_of_num_classes() {
    let device = Default::default();
    let loss_fn = SegmentationCrossEntropyLossConfig::new().init::<B>(&device);

    let predictions = Tensor::<B, 4>::zeros([1, 2, 4, 4], &device);
    let targets = Tensor::<B, 4, Int>::zeros([1, 1, 4, 4], &device);

    let loss = scalar(loss_fn.forward(predictions, targets, all_valid([1, 1, 4, 4])));
    assert!((loss - LN_2).abs() < 1e-5, "got {loss}");
}

#[test]
fn masked_pixels_do_not_contribute() {
    let device = Default::default();
    let loss_fn = SegmentationCrossEntropyLossConfig::new().init::<B>(&device);

    // Two pixels: the first confidently wrong, the second uniform.
    let predictions = Tensor::<B, 4>::from_data(
        TensorData::new(vec![0.0f32, 0.0, 100.0, 0.0], [1, 2, 1, 2]),
        &device,
    );
    let targets = Tensor::<B, 4, Int>::zeros([1, 1, 1, 2], &device);
    let mask = Tensor::<B, 4, Int>::from_data(TensorData::new(vec![0i64, 1], [1, 1, 1, 2]), &device)
        .bool();

    let loss = scalar(loss_fn.forward(predictions, targets, mask));
    assert!((loss - LN_2).abs() < 1e-4, "got {loss}");
}

#[test]
fn all_masked_batch_has_zero_loss() {
    let device = Default::default();
    let loss_fn = SegmentationCrossEntropyLossConfig::new().init::<B>(&device);

    let predictions = Tensor::<B, 4>::zeros([1, 2, 2, 2], &device);
    let targets = Tensor::<B, 4, Int>::zeros([1, 1, 2, 2], &device);
    let mask = Tensor::<B, 4, Int>::zeros([1, 1, 2, 2], &device).bool();

    let loss = scalar(loss_fn.forward(predictions, targets, mask));
    assert_eq!(loss, 0.0);
}

#[test]
fn ignore_index_excludes_class_pixels() {
    let device = Default::default();
    let loss_fn = SegmentationCrossEntropyLossConfig::new()
        .with_ignore_index(Some(0))
        .init::<B>(&device);

    // One background pixel (ignored) and one uniform road pixel.
    let predictions = Tensor::<B, 4>::from_data(
        TensorData::new(vec![100.0f32, 0.0, 0.0, 0.0], [1, 2, 1, 2]),
        &device,
    );
    let targets =
        Tensor::<B, 4, Int>::from_data(TensorData::new(vec![0i64, 1], [1, 1, 1, 2]), &device);

    let loss = scalar(loss_fn.forward(predictions, targets, all_valid([1, 1, 1, 2])));
    assert!((loss - LN_2).abs() < 1e-4, "got {loss}");
}

#[test]
fn class_weights_rescale_the_mean() {
    let device = Default::default();
    let loss_fn = SegmentationCrossEntropyLossConfig::new()
        .with_weights(Some(vec![1.0, 3.0]))
        .init::<B>(&device);

    // Pixel 0: uniform logits, class 0 -> nll = ln 2, weight 1.
    // Pixel 1: confidently correct class 1 -> nll ~ 0, weight 3.
    let predictions = Tensor::<B, 4>::from_data(
        TensorData::new(vec![0.0f32, -100.0, 0.0, 0.0], [1, 2, 1, 2]),
        &device,
    );
    let targets =
        Tensor::<B, 4, Int>::from_data(TensorData::new(vec![0i64, 1], [1, 1, 1, 2]), &device);

    let loss = scalar(loss_fn.forward(predictions, targets, all_valid([1, 1, 1, 2])));
    let expected = LN_2 / 4.0;
    assert!((loss - expected).abs() < 1e-4, "got {loss}");
}

#[test]
fn smoothing_keeps_uniform_logit_cost() {
    let device = Default::default();
    let loss_fn = SegmentationCrossEntropyLossConfig::new()
        .with_smoothing(Some(0.1))
        .init::<B>(&device);

    // With uniform logits every class has the same log-probability, so
    // smoothing redistributes the target mass without changing the cost.
    let predictions = Tensor::<B, 4>::zeros([1, 2, 2, 2], &device);
    let targets = Tensor::<B, 4, Int>::zeros([1, 1, 2, 2], &device);

    let loss = scalar(loss_fn.forward(predictions, targets, all_valid([1, 1, 2, 2])));
    assert!((loss - LN_2).abs() < 1e-5, "got {loss}");
}
