use std::path::PathBuf;

use anyhow::Result;
use burn::data::dataloader::Dataset;
use burn::{
    backend::{Autodiff, Wgpu, wgpu::WgpuDevice},
    data::dataloader::DataLoaderBuilder,
    optim::AdamConfig,
    prelude::*,
    record::CompactRecorder,
    train::{
        LearnerBuilder,
        metric::{CpuMemory, CpuUse, LossMetric},
    },
};
use clap::Args;

use burn_fcn::{
    Fcn8sConfig, InputMode, SegmentationConfig, SegmentationMode, dataset::SegmentationBatcher,
    training::IoUMetric,
};

use crate::road_dataset::RoadDataset;

#[derive(Args)]
pub struct TrainArgs {
    /// KITTI road training root containing image_2/ and gt_image_2/.
    #[arg(short, long)]
    pub data_dir: PathBuf,

    /// Pretrained VGG-16 encoder record. Trains from scratch when absent.
    #[arg(long)]
    pub vgg_weights: Option<PathBuf>,

    #[arg(short, long, default_value_t = 37)]
    pub epochs: usize,

    #[arg(short, long, default_value_t = 17)]
    pub batch_size: usize,

    #[arg(short, long, default_value_t = 0.001)]
    pub lr: f64,

    #[arg(long, default_value_t = 4)]
    pub num_workers: usize,

    #[arg(long, default_value_t = true)]
    pub save_checkpoints: bool,

    #[arg(short, long, default_value = "artifacts")]
    pub artifact_dir: PathBuf,

    #[arg(long, default_value_t = 2)]
    pub num_classes: usize,

    #[arg(long, default_value_t = 160)]
    pub image_height: usize,

    #[arg(long, default_value_t = 576)]
    pub image_width: usize,

    #[arg(long, default_value_t = 0.8)]
    pub train_ratio: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

fn create_artifact_dir(artifact_dir: &str) {
    std::fs::remove_dir_all(artifact_dir).ok();
    std::fs::create_dir_all(artifact_dir).ok();
}

pub fn run(args: &TrainArgs) -> Result<()> {
    type MyBackend = Wgpu<f32, i32>;
    type MyAutodiffBackend = Autodiff<MyBackend>;

    let artifact_dir = args.artifact_dir.to_str().expect("Can't find artifact dir");
    create_artifact_dir(artifact_dir);

    println!("Initializing device...");
    let device = WgpuDevice::default();

    MyAutodiffBackend::seed(args.seed);

    let image_size = [args.image_height, args.image_width];

    let seg_mode = if args.num_classes <= 2 {
        SegmentationMode::Binary
    } else {
        SegmentationMode::Multiclass {
            num_classes: args.num_classes,
        }
    };

    let seg_config = SegmentationConfig::new(seg_mode, InputMode::RGB, image_size);

    println!("Loading dataset from {}...", args.data_dir.display());
    let (train_dataset, valid_dataset) =
        match RoadDataset::split(&args.data_dir, image_size, args.train_ratio) {
            Ok(datasets) => datasets,
            Err(e) => {
                return Err(anyhow::anyhow!("Failed to load dataset: {}", e));
            }
        };
    println!(
        "Loaded {} samples (training) / {} samples (validation)",
        train_dataset.len(),
        valid_dataset.len()
    );

    println!("Creating data batchers...");
    let batcher_train =
        SegmentationBatcher::<MyAutodiffBackend>::new(device.clone(), seg_config.clone());
    let batcher_valid = SegmentationBatcher::<MyBackend>::new(device.clone(), seg_config.clone());

    println!(
        "Building dataloaders with batch size {}...",
        args.batch_size
    );
    let dataloader_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(args.batch_size)
        .num_workers(args.num_workers)
        .shuffle(args.seed)
        .build(train_dataset);

    let dataloader_valid = DataLoaderBuilder::new(batcher_valid)
        .shuffle(args.seed)
        .build(valid_dataset);

    println!(
        "Creating FCN-8s model with {} classes...",
        args.num_classes
    );
    let model = Fcn8sConfig::new()
        .with_num_classes(args.num_classes)
        .init(&device);

    let model = match &args.vgg_weights {
        Some(path) => model
            .with_pretrained_encoder(path, &device)
            .map_err(|e| anyhow::anyhow!("Failed to load encoder weights: {}", e))?,
        None => {
            println!("No pretrained encoder weights supplied, training from scratch");
            model
        }
    };

    println!(
        "Initializing Adam optimizer with learning rate {}...",
        args.lr
    );
    let optimizer = AdamConfig::new().init();

    println!("Building learner...");
    let mut learner = LearnerBuilder::new(artifact_dir)
        // Model metrics
        .metric_train_numeric(LossMetric::new())
        .metric_valid_numeric(LossMetric::new())
        .metric_train_numeric(IoUMetric::new())
        .metric_valid_numeric(IoUMetric::new())
        // System metrics
        .metric_train_numeric(CpuUse::new())
        .metric_valid_numeric(CpuUse::new())
        .metric_train_numeric(CpuMemory::new())
        .metric_valid_numeric(CpuMemory::new())
        .devices(vec![device.clone()])
        .num_epochs(args.epochs)
        .summary();

    if args.save_checkpoints {
        learner = learner.with_file_checkpointer(CompactRecorder::new())
    }

    let learner = learner.build(model, optimizer, args.lr);

    let model_trained = learner.fit(dataloader_train, dataloader_valid);

    println!("Saving model record...");
    model_trained
        .save_file(format!("{artifact_dir}/model"), &CompactRecorder::new())
        .map_err(|e| anyhow::anyhow!("Failed to save trained model: {}", e))?;

    println!("Training completed successfully!");
    Ok(())
}
