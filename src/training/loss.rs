use burn::{
    module::{Content, DisplaySettings, ModuleDisplay},
    prelude::*,
    tensor::activation::log_softmax,
};

/// Configuration to create a [SegmentationCrossEntropyLoss] using the
/// [init function](SegmentationCrossEntropyLossConfig::init).
#[derive(Config, Debug)]
pub struct SegmentationCrossEntropyLossConfig {
    /// Create cross-entropy with label smoothing.
    ///
    /// Hard labels {0, 1} will be changed to y_smoothed = y(1 - a) + a / nr_classes.
    /// Alpha = 0 would be the same as default.
    pub smoothing: Option<f32>,

    /// Create weighted cross-entropy.
    ///
    /// The loss of a specific pixel will be multiplied by the weight
    /// corresponding to its class label.
    ///
    /// # Pre-conditions
    ///   - The order of the weight vector should correspond to the label integer assignment.
    ///   - All weights must be positive.
    pub weights: Option<Vec<f32>>,

    /// Treat inputs as logits (softmax applied internally). When false,
    /// inputs are assumed to be probabilities.
    #[config(default = true)]
    pub logits: bool,

    /// Class index excluded from the loss calculation. Useful to ignore
    /// background or boundary classes.
    pub ignore_index: Option<usize>,
}

impl SegmentationCrossEntropyLossConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SegmentationCrossEntropyLoss<B> {
        self.assertions();
        SegmentationCrossEntropyLoss {
            weights: self
                .weights
                .as_ref()
                .map(|e| Tensor::<B, 1>::from_floats(e.as_slice(), device)),
            smoothing: self.smoothing,
            logits: self.logits,
            ignore_index: self.ignore_index,
        }
    }

    fn assertions(&self) {
        if let Some(alpha) = self.smoothing {
            assert!(
                (0.0..=1.).contains(&alpha),
                "Alpha of Cross-entropy loss with smoothed labels should be in interval [0, 1]. Got {}",
                alpha
            );
        };
        if let Some(weights) = self.weights.as_ref() {
            assert!(
                weights.iter().all(|e| e > &0.),
                "Weights of cross-entropy have to be positive."
            );
        }
    }
}

/// Pixel-wise cross-entropy over class logits, averaged over valid pixels.
///
/// Should be created using [SegmentationCrossEntropyLossConfig].
#[derive(Module, Debug)]
#[module(custom_display)]
pub struct SegmentationCrossEntropyLoss<B: Backend> {
    /// Weights for cross-entropy.
    pub weights: Option<Tensor<B, 1>>,
    /// Label smoothing factor.
    pub smoothing: Option<f32>,
    /// Use logits as input.
    pub logits: bool,
    /// Ignore specific index during loss calculation.
    pub ignore_index: Option<usize>,
}

impl<B: Backend> ModuleDisplay for SegmentationCrossEntropyLoss<B> {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("weights", &self.weights)
            .add("smoothing", &self.smoothing)
            .add("logits", &self.logits)
            .add("ignore_index", &self.ignore_index)
            .optional()
    }
}

impl<B: Backend> SegmentationCrossEntropyLoss<B> {
    /// Compute the criterion on the input tensor.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, num_classes, height, width]`
    /// - targets: `[batch_size, 1, height, width]` (integer class indices)
    /// - mask: `[batch_size, 1, height, width]` (true indicates a valid pixel)
    pub fn forward(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4, Int>,
        mask: Tensor<B, 4, Bool>,
    ) -> Tensor<B, 1> {
        Self::assertions(&predictions, &targets, &mask);

        let [batch_size, num_classes, height, width] = predictions.dims();
        let n_pixels = batch_size * height * width;

        let predictions = predictions
            .reshape([batch_size, num_classes, height * width])
            .permute([0, 2, 1])
            .reshape([n_pixels, num_classes]);
        let targets = targets.reshape([n_pixels]);
        let mask = mask.reshape([n_pixels]);

        // A pixel contributes only when it is inside the mask AND not of
        // the ignored class.
        let mask = match self.ignore_index {
            Some(ignore_idx) => {
                let keep = targets.clone().not_equal_elem(ignore_idx as i32);
                (mask.int() * keep.int()).bool()
            }
            None => mask,
        };

        let log_probs = if self.logits {
            log_softmax(predictions, 1)
        } else {
            predictions.clamp_min(1e-8).log()
        };

        let nll = match self.smoothing {
            Some(alpha) => {
                let smoothed =
                    Self::compute_smoothed_targets(num_classes, targets.clone(), alpha);
                (smoothed * log_probs).sum_dim(1).reshape([n_pixels]).neg()
            }
            None => log_probs
                .gather(1, targets.clone().reshape([n_pixels, 1]))
                .reshape([n_pixels])
                .neg(),
        };

        match &self.weights {
            Some(weights) => {
                let weights = weights.clone().gather(0, targets);
                let nll = (nll * weights.clone()).mask_fill(mask.clone().bool_not(), 0.0);
                // Weighted mean over valid pixels; the clamp keeps the
                // all-invalid batch at zero loss instead of dividing by zero.
                let denominator = (weights * mask.int().float()).sum().clamp_min(1e-8);
                nll.sum() / denominator
            }
            None => {
                let nll = nll.mask_fill(mask.clone().bool_not(), 0.0);
                let denominator = mask.int().float().sum().clamp_min(1.0);
                nll.sum() / denominator
            }
        }
    }

    fn compute_smoothed_targets(
        num_classes: usize,
        targets: Tensor<B, 1, Int>,
        alpha: f32,
    ) -> Tensor<B, 2> {
        let device = &targets.device();
        let [n_pixels] = targets.dims();
        let targets_matrix = Tensor::<B, 2>::zeros([n_pixels, num_classes], device).scatter(
            1,
            targets.reshape([n_pixels, 1]),
            Tensor::ones([n_pixels, 1], device),
        );
        targets_matrix * (1. - alpha) + alpha / num_classes as f32
    }

    fn assertions(
        predictions: &Tensor<B, 4>,
        targets: &Tensor<B, 4, Int>,
        mask: &Tensor<B, 4, Bool>,
    ) {
        let [pred_batch, _pred_classes, pred_height, pred_width] = predictions.dims();
        let [target_batch, target_channels, target_height, target_width] = targets.dims();
        let [mask_batch, mask_channels, mask_height, mask_width] = mask.dims();

        assert_eq!(
            pred_batch, target_batch,
            "Batch size mismatch: predictions ({}) vs targets ({})",
            pred_batch, target_batch
        );

        assert_eq!(
            pred_batch, mask_batch,
            "Batch size mismatch: predictions ({}) vs mask ({})",
            pred_batch, mask_batch
        );

        assert_eq!(
            target_channels, 1,
            "Target should have exactly 1 channel, got {}",
            target_channels
        );

        assert_eq!(
            mask_channels, 1,
            "Mask should have exactly 1 channel, got {}",
            mask_channels
        );

        assert_eq!(
            (pred_height, pred_width),
            (target_height, target_width),
            "Spatial dimensions mismatch: predictions vs targets"
        );

        assert_eq!(
            (pred_height, pred_width),
            (mask_height, mask_width),
            "Spatial dimensions mismatch: predictions vs mask"
        );
    }
}
