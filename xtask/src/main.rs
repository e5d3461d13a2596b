use anyhow::Result;
use clap::{Parser, Subcommand};

mod road_dataset;
mod tasks;

#[derive(Parser)]
#[command(
    name = "rust-fcn",
    about = "FCN-8s road segmentation toolkit",
    author,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Train(tasks::train::TrainArgs),
    Infer(tasks::infer::InferArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Train(args) => tasks::train::run(args),
        Commands::Infer(args) => tasks::infer::run(args),
    }
}
