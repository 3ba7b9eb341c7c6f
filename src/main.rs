#![recursion_limit = "256"]

use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    optim::AdamConfig,
    tensor::backend::AutodiffBackend,
};
use clap::{Parser, Subcommand, ValueEnum};
use cvgen::{
    model::ModelConfig,
    training::{self, GanConfig},
    transfer::{self, StyleTransferConfig, TransferPaths},
};
use std::{error::Error, path::PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Output directory of the GAN run.
const SAMPLE_DIR: &str = "samples";

#[derive(Parser, Debug)]
#[command(name = "cvgen", about = "MNIST GAN and neural style transfer on burn")]
struct Cli {
    /// Backend to run on
    #[arg(long, value_enum, default_value_t = DeviceKind::Gpu)]
    device: DeviceKind,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DeviceKind {
    /// ndarray on the CPU
    Cpu,
    /// wgpu on the default adapter
    Gpu,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train the MNIST GAN; writes image grids and checkpoints to `samples/`
    Gan,
    /// Repaint a content image in the style of another
    Style(StyleArgs),
}

#[derive(clap::Args, Debug)]
struct StyleArgs {
    /// Content image
    #[arg(long, default_value = "../samples/style_transfer_png/mount.png")]
    content: PathBuf,
    /// Style image
    #[arg(long, default_value = "../samples/style_transfer_png/autumn.png")]
    style: PathBuf,
    /// Longest side of the working images
    #[arg(long, default_value_t = 600)]
    max_size: u32,
    #[arg(long, default_value_t = 500)]
    iterations: usize,
    /// Log every N iterations
    #[arg(long, default_value_t = 20)]
    log_every: usize,
    /// Divide the learning rate by 10 every N iterations
    #[arg(long, default_value_t = 200)]
    lr_decay_every: usize,
    /// Weight of the content loss
    #[arg(long, default_value_t = 1.0)]
    content_weight: f32,
    /// Weight of the style loss
    #[arg(long, default_value_t = 1000.0)]
    style_weight: f32,
    /// Weight of the total variation de-noising loss
    #[arg(long, default_value_t = 10.0)]
    tv_weight: f32,
    #[arg(long, default_value_t = 0.003)]
    lr: f64,
    /// Where the result is written; it is not displayed
    #[arg(long, default_value = "style_demo.png")]
    output: PathBuf,
    /// VGG19 burn record, without extension
    #[arg(long, default_value = "models/vgg19")]
    weights: PathBuf,
    #[arg(long, value_delimiter = ',', default_values_t = transfer::DEFAULT_STYLE_LAYERS.map(String::from))]
    style_layers: Vec<String>,
    #[arg(long, value_delimiter = ',', default_values_t = transfer::DEFAULT_CONTENT_LAYERS.map(String::from))]
    content_layers: Vec<String>,
}

impl StyleArgs {
    fn config(&self) -> StyleTransferConfig {
        StyleTransferConfig::new(
            AdamConfig::new(),
            self.style_layers.clone(),
            self.content_layers.clone(),
        )
        .with_max_size(self.max_size)
        .with_iterations(self.iterations)
        .with_log_every(self.log_every)
        .with_lr_decay_every(self.lr_decay_every)
        .with_content_weight(self.content_weight)
        .with_style_weight(self.style_weight)
        .with_tv_weight(self.tv_weight)
        .with_lr(self.lr)
    }

    fn paths(&self) -> TransferPaths {
        TransferPaths {
            content: self.content.clone(),
            style: self.style.clone(),
            weights: self.weights.clone(),
            output: self.output.clone(),
        }
    }
}

fn run<B: AutodiffBackend>(command: Command, device: B::Device) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Gan => {
            let config = GanConfig::new(
                ModelConfig::mnist(),
                AdamConfig::new(),
                AdamConfig::new(),
                SAMPLE_DIR.to_string(),
            );
            training::train::<B>(config, &device)?;
        }
        Command::Style(args) => {
            info!("{:?}", args);
            transfer::run::<B>(&args.config(), &args.paths(), &device)?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("device: {:?}", cli.device);

    match cli.device {
        DeviceKind::Cpu => run::<Autodiff<NdArray<f32>>>(cli.command, NdArrayDevice::Cpu),
        DeviceKind::Gpu => run::<Autodiff<Wgpu<f32>>>(cli.command, WgpuDevice::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gan_takes_no_flags() {
        let cli = Cli::try_parse_from(["cvgen", "--device", "cpu", "gan"]).unwrap();

        assert_eq!(cli.device, DeviceKind::Cpu);
        assert!(matches!(cli.command, Command::Gan));
        assert!(Cli::try_parse_from(["cvgen", "gan", "--epochs", "3"]).is_err());
    }

    #[test]
    fn test_style_defaults() {
        let cli = Cli::try_parse_from(["cvgen", "style"]).unwrap();
        let Command::Style(args) = cli.command else {
            panic!("expected style command");
        };

        let config = args.config();
        assert_eq!(cli.device, DeviceKind::Gpu);
        assert_eq!(config.iterations, 500);
        assert_eq!(config.lr_decay_every, 200);
        assert_eq!(config.style_layers.len(), 5);
        assert_eq!(config.content_layers, vec!["conv4_4".to_string()]);
        assert_eq!(args.paths().output, PathBuf::from("style_demo.png"));
    }

    #[test]
    fn test_style_overrides() {
        let cli = Cli::try_parse_from([
            "cvgen",
            "style",
            "--content",
            "a.png",
            "--style",
            "b.png",
            "--iterations",
            "10",
            "--style-weight",
            "5e4",
            "--style-layers",
            "conv1_1,conv2_1",
        ])
        .unwrap();
        let Command::Style(args) = cli.command else {
            panic!("expected style command");
        };

        let config = args.config();
        assert_eq!(config.iterations, 10);
        assert_eq!(config.style_weight, 5e4);
        assert_eq!(config.style_layers, vec!["conv1_1", "conv2_1"]);
        assert_eq!(args.paths().content, PathBuf::from("a.png"));
    }
}
