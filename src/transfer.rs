pub mod canvas;
pub mod loss;

use burn::{
    config::Config,
    module::Module,
    optim::AdamConfig,
    tensor::{backend::AutodiffBackend, cast::ToElement, Tensor},
};
use std::{path::PathBuf, time::Instant};
use tracing::info;

use crate::{
    model::{
        features::{resolve_taps, FeatureExtractor},
        vgg19::Vgg19,
    },
    optim::{StepLr, TrainState},
    transfer::{
        canvas::Canvas,
        loss::{compute_loss, LossWeights, Targets},
    },
    utils::{
        fit_within, image_to_tensor, load_image, resize_image, tensor_to_image, IMAGENET,
    },
};

/// conv1_1 ~ conv5_1
pub const DEFAULT_STYLE_LAYERS: [&str; 5] =
    ["conv1_1", "conv2_1", "conv3_1", "conv4_1", "conv5_1"];
pub const DEFAULT_CONTENT_LAYERS: [&str; 1] = ["conv4_4"];

#[derive(Config)]
pub struct StyleTransferConfig {
    pub optimizer: AdamConfig,
    pub style_layers: Vec<String>,
    pub content_layers: Vec<String>,

    #[config(default = 600)]
    pub max_size: u32,
    #[config(default = 500)]
    pub iterations: usize,
    #[config(default = 20)]
    pub log_every: usize,
    #[config(default = 200)]
    pub lr_decay_every: usize,
    #[config(default = 0.1)]
    pub lr_decay: f64,
    #[config(default = 0.003)]
    pub lr: f64,
    #[config(default = 1.0)]
    pub content_weight: f32,
    #[config(default = 1000.0)]
    pub style_weight: f32,
    #[config(default = 10.0)]
    pub tv_weight: f32,
}

impl StyleTransferConfig {
    pub fn vgg19_default() -> Self {
        Self::new(
            AdamConfig::new(),
            DEFAULT_STYLE_LAYERS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_CONTENT_LAYERS.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn weights(&self) -> LossWeights {
        LossWeights {
            content: self.content_weight,
            style: self.style_weight,
            tv: self.tv_weight,
        }
    }
}

/// Files read and written by [`run`].
#[derive(Debug, Clone)]
pub struct TransferPaths {
    pub content: PathBuf,
    pub style: PathBuf,
    /// VGG19 burn record, without extension
    pub weights: PathBuf,
    pub output: PathBuf,
}

/// Optimizes a copy of `content` (normalized `[1, 3, H, W]`) towards the
/// style statistics of `style`. Returns the detached, still normalized result.
pub fn optimize<B: AutodiffBackend>(
    extractor: &FeatureExtractor<B>,
    content: Tensor<B, 4>,
    style: Tensor<B, 4>,
    config: &StyleTransferConfig,
) -> Tensor<B, 4> {
    let targets = Targets::new(
        extractor.forward(content.clone()),
        extractor.forward(style),
    );
    let weights = config.weights();

    let mut canvas = TrainState::new(Canvas::new(content), config.optimizer.init());
    let mut schedule = StepLr::new(config.lr, config.lr_decay_every, config.lr_decay);

    for it in 0..config.iterations {
        let start = Instant::now();

        let image = canvas.module().forward();
        let features = extractor.forward(image.clone());
        let losses = compute_loss(image, features, &targets, &weights);

        let should_log = config.log_every > 0 && (it + 1) % config.log_every == 0;
        let scalars = should_log.then(|| {
            [
                losses.content.clone(),
                losses.style.clone(),
                losses.tv.clone(),
                losses.total.clone(),
            ]
            .map(|loss| loss.into_scalar().to_f32())
        });

        canvas.step(schedule.lr(), losses.total.backward());
        schedule.step();

        if let Some([content, style, tv, total]) = scalars {
            info!(
                "iteration {:3}/{:3}, content loss {:.2}, style loss {:.2}, TV loss {:.2}, total loss {:.2}, {:.2} sec/iteration",
                it + 1,
                config.iterations,
                content,
                style,
                tv,
                total,
                start.elapsed().as_secs_f32(),
            );
        }
    }

    canvas.into_module().forward().detach()
}

/// Loads both images, runs [`optimize`] and writes the result.
pub fn run<B: AutodiffBackend>(
    config: &StyleTransferConfig,
    paths: &TransferPaths,
    device: &B::Device,
) -> crate::Result<()> {
    let content_image = load_image(&paths.content)?;
    let (width, height) = fit_within(
        content_image.width(),
        content_image.height(),
        config.max_size,
    );
    info!("image shape: {}x{}", width, height);

    let content_image = resize_image(&content_image, width, height);
    let style_image = resize_image(&load_image(&paths.style)?, width, height);

    let taps = resolve_taps(&config.style_layers, &config.content_layers)?;
    let vgg = Vgg19::<B>::from_file(&paths.weights, device)?.no_grad();
    let extractor = FeatureExtractor::new(vgg, taps);

    let content = IMAGENET.normalize(image_to_tensor::<B>(&content_image, device));
    let style = IMAGENET.normalize(image_to_tensor::<B>(&style_image, device));

    let output = optimize(&extractor, content, style, config);

    let output = IMAGENET.denormalize(output).squeeze(0);
    tensor_to_image(output)?.save(&paths.output)?;
    info!("saved {}", paths.output.display());

    Ok(())
}
