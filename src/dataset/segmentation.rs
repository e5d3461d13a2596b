use std::path::PathBuf;

use burn::data::dataset::vision::PixelDepth;
use burn::{data::dataloader::batcher::Batcher, prelude::*};

#[derive(Config, Debug)]
pub enum SegmentationMode {
    Binary,
    Multiclass { num_classes: usize },
}

impl SegmentationMode {
    pub fn num_classes(&self) -> usize {
        match self {
            SegmentationMode::Binary => 2,
            SegmentationMode::Multiclass { num_classes } => *num_classes,
        }
    }
}

#[derive(Config, Debug)]
pub enum InputMode {
    Grayscale,
    RGB,
}

impl InputMode {
    pub fn channels(&self) -> usize {
        match self {
            InputMode::Grayscale => 1,
            InputMode::RGB => 3,
        }
    }
}

#[derive(Config, Debug)]
pub struct SegmentationConfig {
    pub mode: SegmentationMode,
    pub input_mode: InputMode,
    pub image_size: [usize; 2],
    pub class_names: Option<Vec<String>>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            mode: SegmentationMode::Binary,
            input_mode: InputMode::RGB,
            image_size: [160, 576],
            class_names: None,
        }
    }
}

/// Paths to one image and its ground-truth mask on disk.
#[derive(Debug, Clone)]
pub struct SegmentationImageItemRaw {
    pub image_path: PathBuf,
    pub mask_path: PathBuf,
}

/// A decoded sample: interleaved RGB pixel data plus per-pixel class
/// indices, both already at the working image size.
#[derive(Debug, Clone)]
pub struct SegmentationImageItem {
    pub image: Vec<PixelDepth>,
    pub mask: Vec<usize>,
}

#[derive(Clone)]
pub struct SegmentationBatcher<B: Backend> {
    device: B::Device,
    config: SegmentationConfig,
}

impl<B: Backend> SegmentationBatcher<B> {
    pub fn new(device: B::Device, config: SegmentationConfig) -> Self {
        Self { device, config }
    }
}

#[derive(Clone, Debug)]
pub struct SegmentationBatch<B: Backend> {
    pub images: Tensor<B, 4, Float>,
    pub masks: Tensor<B, 4, Int>,
}

fn pixel_to_f32(pixel: &PixelDepth) -> f32 {
    match pixel {
        PixelDepth::U8(v) => *v as f32 / 255.0,
        PixelDepth::U16(v) => *v as f32 / 65535.0,
        PixelDepth::F32(v) => *v,
    }
}

impl<B: Backend> Batcher<SegmentationImageItem, SegmentationBatch<B>> for SegmentationBatcher<B> {
    fn batch(&self, items: Vec<SegmentationImageItem>) -> SegmentationBatch<B> {
        let batch_size = items.len();
        let [height, width] = self.config.image_size;

        let mut images = Vec::with_capacity(batch_size);
        let mut masks = Vec::with_capacity(batch_size);

        for item in items {
            let image_tensor: Tensor<B, 3> = match self.config.input_mode {
                InputMode::RGB => {
                    let mut image_data = Vec::with_capacity(3 * height * width);

                    for c in 0..3 {
                        for y in 0..height {
                            for x in 0..width {
                                let idx = (y * width + x) * 3 + c;
                                let val = item.image.get(idx).map(pixel_to_f32).unwrap_or(0.0);
                                image_data.push(val);
                            }
                        }
                    }

                    Tensor::<B, 3>::from_data(
                        TensorData::new(image_data, Shape::new([3, height, width]))
                            .convert::<B::FloatElem>(),
                        &self.device,
                    )
                }
                InputMode::Grayscale => {
                    let mut image_data = Vec::with_capacity(height * width);

                    for y in 0..height {
                        for x in 0..width {
                            let idx = (y * width + x) * 3; // RGB format in the dataset
                            let val = item.image.get(idx).map(pixel_to_f32).unwrap_or(0.0);
                            image_data.push(val);
                        }
                    }

                    Tensor::<B, 3>::from_data(
                        TensorData::new(image_data, Shape::new([1, height, width]))
                            .convert::<B::FloatElem>(),
                        &self.device,
                    )
                }
            };

            let int_mask: Vec<i32> = match self.config.mode {
                SegmentationMode::Binary => (0..height * width)
                    .map(|idx| match item.mask.get(idx) {
                        Some(&v) if v > 0 => 1,
                        _ => 0,
                    })
                    .collect(),
                SegmentationMode::Multiclass { .. } => (0..height * width)
                    .map(|idx| item.mask.get(idx).copied().unwrap_or(0) as i32)
                    .collect(),
            };

            let mask_tensor: Tensor<B, 3, Int> = Tensor::<B, 3, Int>::from_data(
                TensorData::new(int_mask, Shape::new([1, height, width]))
                    .convert::<B::IntElem>(),
                &self.device,
            );

            images.push(image_tensor);
            masks.push(mask_tensor);
        }

        let images: Tensor<B, 4> = Tensor::stack::<4>(images.to_vec(), 0);
        let masks: Tensor<B, 4, Int> = Tensor::stack::<4>(masks.to_vec(), 0);

        SegmentationBatch { images, masks }
    }
}
