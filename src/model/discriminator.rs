use burn::{
    module::Module,
    nn::{Linear, LinearConfig, Sigmoid},
    prelude::*,
};

use crate::model::layers::DiscBlock;

/// Scores flattened images with the probability of being real.
#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    disc_layer_1: DiscBlock<B>,
    disc_layer_2: DiscBlock<B>,
    out_layer: Linear<B>,
    sig: Sigmoid,
}
impl<B: Backend> Discriminator<B> {
    /// `[batch, image_size]` -> `[batch, 1]` in `(0, 1)`
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let output = self.disc_layer_1.forward(input);
        let output = self.disc_layer_2.forward(output);
        let output = self.out_layer.forward(output);

        // keeps BCE away from log(0)
        self.sig.forward(output).clamp(0.00001, 0.99999)
    }
}

#[derive(Config, Debug)]
pub struct DiscriminatorConfig {
    #[config(default = 784)]
    pub image_size: usize,
    #[config(default = 128)]
    pub hidden_size: usize,
}
impl DiscriminatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Discriminator<B> {
        let disc_layer_1 = DiscBlock::new([self.image_size, self.hidden_size], device);
        let disc_layer_2 = DiscBlock::new([self.hidden_size, self.hidden_size], device);
        let out_layer = LinearConfig::new(self.hidden_size, 1).init(device);
        let sig = Sigmoid::new();

        Discriminator {
            disc_layer_1,
            disc_layer_2,
            out_layer,
            sig,
        }
    }
}
