use burn::{
    module::Module,
    nn::{Linear, LinearConfig, Tanh},
    prelude::*,
};

use crate::model::layers::GenBlock;

/// Maps latent vectors to flattened images in `[-1, 1]`.
#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    gen_layer_1: GenBlock<B>,
    gen_layer_2: GenBlock<B>,
    out_layer: Linear<B>,
    tanh: Tanh,
}
impl<B: Backend> Generator<B> {
    /// `[batch, latent_size]` -> `[batch, image_size]`
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let output = self.gen_layer_1.forward(input);
        let output = self.gen_layer_2.forward(output);
        let output = self.out_layer.forward(output);

        self.tanh.forward(output)
    }
}

#[derive(Config, Debug)]
pub struct GeneratorConfig {
    #[config(default = 64)]
    pub latent_size: usize,
    #[config(default = 128)]
    pub hidden_size: usize,
    #[config(default = 784)]
    pub image_size: usize,
}
impl GeneratorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Generator<B> {
        let gen_layer_1 = GenBlock::new([self.latent_size, self.hidden_size], device);
        let gen_layer_2 = GenBlock::new([self.hidden_size, self.hidden_size], device);
        let out_layer = LinearConfig::new(self.hidden_size, self.image_size).init(device);
        let tanh = Tanh::new();

        Generator {
            gen_layer_1,
            gen_layer_2,
            out_layer,
            tanh,
        }
    }
}
