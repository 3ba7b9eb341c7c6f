use burn::{
    config::Config,
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::vision::MnistDataset,
    },
    module::Module,
    nn::loss::{BinaryCrossEntropyLoss, BinaryCrossEntropyLossConfig},
    optim::{AdamConfig, Optimizer},
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::{
        backend::{AutodiffBackend, Backend},
        cast::ToElement,
        Distribution, Int, Tensor,
    },
};
use std::{path::Path, sync::Arc};
use tracing::{info, warn};

use crate::{
    data::{MnistBatch, MnistBatcher},
    model::{discriminator::Discriminator, generator::Generator, ModelConfig},
    optim::TrainState,
    utils::{denorm_tanh, save_image},
};

// ////////////////////////////////////////////////////////////////////////////
// Helpers
const IMAGE_SIDE: usize = 28;

/// BCE on real scores against 1 plus BCE on fake scores against 0.
pub fn discriminator_loss<B: Backend>(
    real_out: Tensor<B, 2>,
    fake_out: Tensor<B, 2>,
    bce: &BinaryCrossEntropyLoss<B>,
) -> Tensor<B, 1> {
    let real_targets = Tensor::<B, 2, Int>::ones(real_out.dims(), &real_out.device());
    let real_loss = bce.forward(real_out, real_targets);

    let fake_targets = Tensor::<B, 2, Int>::zeros(fake_out.dims(), &fake_out.device());
    let fake_loss = bce.forward(fake_out, fake_targets);

    real_loss + fake_loss
}

/// BCE on fake scores against 1: the generator wins when it fools the critic.
pub fn generator_loss<B: Backend>(
    fake_out: Tensor<B, 2>,
    bce: &BinaryCrossEntropyLoss<B>,
) -> Tensor<B, 1> {
    let targets = Tensor::<B, 2, Int>::ones(fake_out.dims(), &fake_out.device());
    bce.forward(fake_out, targets)
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepStats {
    pub d_loss: f32,
    pub g_loss: f32,
    /// Mean D(x) over the real batch
    pub real_score: f32,
    /// Mean D(G(z)) over the fake batch
    pub fake_score: f32,
}

/// One discriminator update followed by one generator update.
///
/// The generator loss is built from `D(G(z))` as scored before the
/// discriminator step; it is not recomputed with the updated weights.
/// Returns the step statistics and the detached fake images.
pub fn train_step<B, OG, OD>(
    generator: &mut TrainState<B, Generator<B>, OG>,
    discriminator: &mut TrainState<B, Discriminator<B>, OD>,
    images: Tensor<B, 2>,
    latent_size: usize,
    lr: f64,
    bce: &BinaryCrossEntropyLoss<B>,
) -> (StepStats, Tensor<B, 2>)
where
    B: AutodiffBackend,
    OG: Optimizer<Generator<B>, B>,
    OD: Optimizer<Discriminator<B>, B>,
{
    let [batch_size, _] = images.dims();
    let device = images.device();

    let real_out = discriminator.module().forward(images);

    let noise = Tensor::<B, 2>::random(
        [batch_size, latent_size],
        Distribution::Normal(0.0, 1.0),
        &device,
    );
    let fake_images = generator.module().forward(noise);

    // both scores come from the pre-update discriminator; each loss keeps
    // its own graph so the two backward passes do not share nodes
    let fake_out = discriminator.module().forward(fake_images.clone().detach());
    let fooled_out = discriminator.module().forward(fake_images.clone());

    let d_loss = discriminator_loss(real_out.clone(), fake_out.clone(), bce);
    let g_loss = generator_loss(fooled_out, bce);

    let stats = StepStats {
        d_loss: d_loss.clone().into_scalar().to_f32(),
        g_loss: g_loss.clone().into_scalar().to_f32(),
        real_score: real_out.mean().into_scalar().to_f32(),
        fake_score: fake_out.mean().into_scalar().to_f32(),
    };

    // train discriminator
    discriminator.step(lr, d_loss.backward());

    // train generator
    generator.step(lr, g_loss.backward());

    (stats, fake_images.detach())
}

fn to_images<B: Backend>(flat: Tensor<B, 2>) -> Tensor<B, 4> {
    let [batch_size, _] = flat.dims();
    denorm_tanh(flat.reshape([batch_size, 1, IMAGE_SIDE, IMAGE_SIDE]))
}

// ////////////////////////////////////////////////////////////////////////////
// Training
#[derive(Config)]
pub struct GanConfig {
    pub model_config: ModelConfig,
    pub gen_optimizer: AdamConfig,
    pub disc_optimizer: AdamConfig,
    /// Receives image grids, checkpoints and `config.json`
    pub outdir: String,

    #[config(default = 20)]
    pub epochs: usize,
    #[config(default = 128)]
    pub batch_size: usize,
    #[config(default = 2e-4)]
    pub lr: f64,
    #[config(default = 200)]
    pub log_interval: usize,
    #[config(default = 8)]
    pub grid_nrow: usize,
    #[config(default = 4)]
    pub num_workers: usize,
    #[config(default = 42)]
    pub seed: u64,
}

/// Trains on the MNIST training split.
pub fn train<B: AutodiffBackend>(
    config: GanConfig,
    device: &B::Device,
) -> crate::Result<()> {
    B::seed(config.seed);

    let dataloader_train: Arc<dyn DataLoader<B, MnistBatch<B>>> =
        DataLoaderBuilder::new(MnistBatcher::new())
            .batch_size(config.batch_size)
            .shuffle(config.seed)
            .num_workers(config.num_workers)
            .build(MnistDataset::train());

    train_with_loader(config, dataloader_train, device)
}

pub fn train_with_loader<B: AutodiffBackend>(
    config: GanConfig,
    dataloader_train: Arc<dyn DataLoader<B, MnistBatch<B>>>,
    device: &B::Device,
) -> crate::Result<()> {
    let outdir = Path::new(&config.outdir);
    std::fs::create_dir_all(outdir)?;
    config.save(outdir.join("config.json"))?;

    let (generator, discriminator) = config.model_config.init::<B>(device);
    let mut generator = TrainState::new(generator, config.gen_optimizer.init());
    let mut discriminator = TrainState::new(discriminator, config.disc_optimizer.init());

    let bce = BinaryCrossEntropyLossConfig::new().init::<B>(device);
    let latent_size = config.model_config.latent_size();
    let total_steps = dataloader_train.num_items().div_ceil(config.batch_size);

    for epoch in 0..config.epochs {
        let mut last_batch = None;

        for (it, batch) in dataloader_train.iter().enumerate() {
            let (stats, fake_images) = train_step(
                &mut generator,
                &mut discriminator,
                batch.images.clone(),
                latent_size,
                config.lr,
                &bce,
            );

            if (it + 1) % config.log_interval == 0 {
                info!(
                    "Epoch [{}/{}], Step [{}/{}], d_loss: {:.4}, g_loss: {:.4}, D(x): {:.4}, D(G(z)): {:.4}",
                    epoch,
                    config.epochs,
                    it + 1,
                    total_steps,
                    stats.d_loss,
                    stats.g_loss,
                    stats.real_score,
                    stats.fake_score,
                );
            }

            last_batch = Some((batch.images, fake_images));
        }

        match last_batch {
            Some((real_images, fake_images)) => {
                let real_path = outdir.join(format!("real_images_{}.png", epoch + 1));
                save_image(to_images(real_images), config.grid_nrow, real_path)?;

                let fake_path = outdir.join(format!("fake_images_{}.png", epoch + 1));
                save_image(to_images(fake_images), config.grid_nrow, fake_path)?;
            }
            None => warn!("epoch {} produced no batches", epoch + 1),
        }
    }

    // save model
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    recorder.record(
        generator.into_module().into_record(),
        outdir.join("generator"),
    )?;
    recorder.record(
        discriminator.into_module().into_record(),
        outdir.join("discriminator"),
    )?;
    info!("saved checkpoints to {}", outdir.display());

    Ok(())
}
