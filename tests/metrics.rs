use burn::backend::NdArray;
use burn::prelude::*;

use burn_fcn::training::metrics::mean_iou;

type B = NdArray<f32>;

fn outputs_from_classes(classes: &[i64], dims: [usize; 4]) -> Tensor<B, 4> {
    let device = Default::default();
    let [batch, n_classes, height, width] = dims;
    let n_pixels = batch * height * width;
    assert_eq!(classes.len(), n_pixels);

    // One-hot logits so the argmax is exactly the requested class map.
    let mut data = vec![0.0f32; batch * n_classes * height * width];
    for (pixel, &class) in classes.iter().enumerate() {
        let b = pixel / (height * width);
        let offset = pixel % (height * width);
        data[(b * n_classes + class as usize) * height * width + offset] = 10.0;
    }

    Tensor::<B, 4>::from_data(TensorData::new(data, dims), &device)
}

fn targets_from_classes(classes: &[i64], dims: [usize; 4]) -> Tensor<B, 4, Int> {
    let device = Default::default();
    Tensor::<B, 4, Int>::from_data(TensorData::new(classes.to_vec(), dims), &device)
}

#[test]
fn perfect_prediction_scores_full_iou() {
    let classes = [0i64, 1, 1, 0];
    let outputs = outputs_from_classes(&classes, [1, 2, 2, 2]);
    let targets = targets_from_classes(&classes, [1, 1, 2, 2]);

    let iou = mean_iou(outputs, targets, None);
    assert!((iou - 1.0).abs() < 1e-9, "got {iou}");
}

#[test]
fn disjoint_prediction_scores_zero() {
    let outputs = outputs_from_classes(&[0, 0, 0, 0], [1, 2, 2, 2]);
    let targets = targets_from_classes(&[1, 1, 1, 1], [1, 1, 2, 2]);

    let iou = mean_iou(outputs, targets, None);
    assert_eq!(iou, 0.0);
}

#[test]
fn half_overlap_scores_one_third() {
    // Prediction covers the left half, target the top half: for each of
    // the two classes the overlap is 1 of 3 covered pixels.
    let outputs = outputs_from_classes(&[1, 0, 1, 0], [1, 2, 2, 2]);
    let targets = targets_from_classes(&[1, 1, 0, 0], [1, 1, 2, 2]);

    let iou = mean_iou(outputs, targets, None);
    assert!((iou - 1.0 / 3.0).abs() < 1e-9, "got {iou}");
}

#[test]
fn ignored_class_is_skipped() {
    let outputs = outputs_from_classes(&[0, 0, 1, 1], [1, 2, 2, 2]);
    let targets = targets_from_classes(&[0, 0, 0, 0], [1, 1, 2, 2]);

    // Only the road class counts; it never intersects the target.
    let iou = mean_iou(outputs, targets, Some(0));
    assert_eq!(iou, 0.0);
}
