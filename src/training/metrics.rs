use std::marker::PhantomData;

use burn::prelude::*;
use burn::train::metric::state::{FormatOptions, NumericMetricState};
use burn::train::metric::{Metric, MetricEntry, MetricMetadata, Numeric};
use derive_new::new;

/// Mean per-class intersection-over-union of argmax predictions.
///
/// Classes absent from both the prediction and the target do not count
/// toward the mean; the result is 0 when no class is present at all.
pub fn mean_iou<B: Backend>(
    outputs: Tensor<B, 4>,
    targets: Tensor<B, 4, Int>,
    ignore_index: Option<usize>,
) -> f64 {
    let [batch_size, n_classes, height, width] = outputs.dims();

    let predictions = outputs.argmax(1).reshape([batch_size, height, width]);
    let targets = targets.reshape([batch_size, height, width]);

    let mut total_iou = 0.0;
    let mut counted_classes = 0;

    for class_idx in 0..n_classes {
        if ignore_index == Some(class_idx) {
            continue;
        }

        let target_mask = targets.clone().equal_elem(class_idx as i64).float();
        let pred_mask = predictions.clone().equal_elem(class_idx as i64).float();

        let intersection = (target_mask.clone() * pred_mask.clone())
            .sum()
            .into_scalar()
            .elem::<f64>();
        let union =
            (target_mask + pred_mask).sum().into_scalar().elem::<f64>() - intersection;

        if union > 0.0 {
            total_iou += intersection / union;
            counted_classes += 1;
        }
    }

    if counted_classes > 0 {
        total_iou / counted_classes as f64
    } else {
        0.0
    }
}

#[derive(Default)]
pub struct IoUMetric<B: Backend> {
    state: NumericMetricState,
    ignore_index: Option<usize>,
    _b: PhantomData<B>,
}

#[derive(new)]
pub struct IoUInput<B: Backend> {
    outputs: Tensor<B, 4>,
    targets: Tensor<B, 4, Int>,
}

impl<B: Backend> IoUMetric<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignore_index(mut self, index: usize) -> Self {
        self.ignore_index = Some(index);
        self
    }
}

impl<B: Backend> Metric for IoUMetric<B> {
    type Input = IoUInput<B>;
    const NAME: &'static str = "IoU";

    fn update(&mut self, input: &IoUInput<B>, _metadata: &MetricMetadata) -> MetricEntry {
        let [batch_size, _, _, _] = input.outputs.dims();

        let iou = mean_iou(
            input.outputs.clone(),
            input.targets.clone(),
            self.ignore_index,
        );

        self.state.update(
            100.0 * iou,
            batch_size,
            FormatOptions::new(Self::NAME).unit("%").precision(2),
        )
    }

    fn clear(&mut self) {
        self.state.reset()
    }
}

impl<B: Backend> Numeric for IoUMetric<B> {
    fn value(&self) -> f64 {
        self.state.value()
    }
}
