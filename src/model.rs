pub mod discriminator;
pub mod features;
pub mod generator;
mod layers;
pub mod vgg19;

use burn::prelude::*;

use crate::model::{
    discriminator::{Discriminator, DiscriminatorConfig},
    generator::{Generator, GeneratorConfig},
};

#[derive(Config, Debug)]
pub struct ModelConfig {
    pub generator_config: GeneratorConfig,
    pub discriminator_config: DiscriminatorConfig,
}
impl ModelConfig {
    /// Generator/discriminator pair with matching image sizes.
    pub fn mnist() -> Self {
        Self::new(GeneratorConfig::new(), DiscriminatorConfig::new())
    }

    pub fn latent_size(&self) -> usize {
        self.generator_config.latent_size
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> (Generator<B>, Discriminator<B>) {
        let generator = self.generator_config.init(device);
        let discriminator = self.discriminator_config.init(device);

        (generator, discriminator)
    }
}
