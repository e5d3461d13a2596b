use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::{
    backend::{Wgpu, wgpu::WgpuDevice},
    prelude::*,
    record::CompactRecorder,
    tensor::activation::softmax,
};
use clap::Args;
use image::imageops::FilterType;

use burn_fcn::Fcn8sConfig;

use crate::road_dataset::SUPPORTED_FILES;

#[derive(Args)]
pub struct InferArgs {
    /// Trained model record, as written by the train task.
    #[arg(short, long, default_value = "artifacts/model")]
    pub model: PathBuf,

    /// Directory of input images, e.g. the KITTI testing image_2 folder.
    #[arg(short, long)]
    pub data_dir: PathBuf,

    /// Output directory for the rendered overlays.
    #[arg(short, long, default_value = "runs")]
    pub runs_dir: PathBuf,

    #[arg(long, default_value_t = 2)]
    pub num_classes: usize,

    #[arg(long, default_value_t = 160)]
    pub image_height: usize,

    #[arg(long, default_value_t = 576)]
    pub image_width: usize,

    /// Class channel rendered as the overlay.
    #[arg(long, default_value_t = 1)]
    pub road_class: usize,

    /// Softmax probability above which a pixel is painted.
    #[arg(long, default_value_t = 0.5)]
    pub threshold: f32,
}

pub fn run(args: &InferArgs) -> Result<()> {
    type MyBackend = Wgpu<f32, i32>;

    println!("Initializing device...");
    let device = WgpuDevice::default();

    println!("Loading model record from {}...", args.model.display());
    let model = Fcn8sConfig::new()
        .with_num_classes(args.num_classes)
        .init::<MyBackend>(&device)
        .load_file(args.model.clone(), &CompactRecorder::new(), &device)
        .with_context(|| format!("Failed to load model record {}", args.model.display()))?;

    fs::create_dir_all(&args.runs_dir)
        .with_context(|| format!("Failed to create {}", args.runs_dir.display()))?;

    let [height, width] = [args.image_height, args.image_width];
    let mut rendered = 0usize;

    for entry in fs::read_dir(&args.data_dir)
        .with_context(|| format!("Failed to read {}", args.data_dir.display()))?
    {
        let path = entry?.path();

        if !path.is_file()
            || !path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    SUPPORTED_FILES
                        .iter()
                        .any(|&valid_ext| valid_ext.eq_ignore_ascii_case(ext))
                })
        {
            continue;
        }

        let original =
            image::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
        let (original_width, original_height) = (original.width(), original.height());

        let resized = original
            .resize_exact(width as u32, height as u32, FilterType::Triangle)
            .into_rgb8();

        let mut image_data = Vec::with_capacity(3 * height * width);
        for c in 0..3 {
            for y in 0..height {
                for x in 0..width {
                    image_data.push(resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0);
                }
            }
        }

        let input = Tensor::<MyBackend, 4>::from_data(
            TensorData::new(image_data, Shape::new([1, 3, height, width])),
            &device,
        );

        let probs = softmax(model.forward(input), 1);
        let road = probs
            .narrow(1, args.road_class, 1)
            .reshape([height * width]);
        let road: Vec<f32> = road.into_data().to_vec().unwrap_or_default();
        if road.len() != height * width {
            anyhow::bail!("Unexpected probability buffer size for {}", path.display());
        }

        // Blend half-transparent green over pixels classified as road.
        let mut overlay = resized;
        for y in 0..height {
            for x in 0..width {
                if road[y * width + x] > args.threshold {
                    let pixel = overlay.get_pixel_mut(x as u32, y as u32);
                    pixel.0 = [
                        pixel.0[0] / 2,
                        ((pixel.0[1] as u16 + 255) / 2) as u8,
                        pixel.0[2] / 2,
                    ];
                }
            }
        }

        let output = image::DynamicImage::ImageRgb8(overlay).resize_exact(
            original_width,
            original_height,
            FilterType::Triangle,
        );

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "sample".to_string());
        let out_path = args.runs_dir.join(format!("{stem}.png"));
        output
            .save(&out_path)
            .with_context(|| format!("Failed to write {}", out_path.display()))?;
        rendered += 1;
    }

    println!(
        "Rendered {} overlays into {}",
        rendered,
        args.runs_dir.display()
    );
    Ok(())
}
