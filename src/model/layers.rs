use burn::{
    nn::{LeakyRelu, LeakyReluConfig, Linear, LinearConfig, Relu},
    prelude::*,
};

/// Fully connected layer followed by a 0.2-slope leaky ReLU.
#[derive(Module, Debug)]
pub struct DiscBlock<B: Backend> {
    fc: Linear<B>,
    lrelu: LeakyRelu,
}
impl<B: Backend> DiscBlock<B> {
    pub fn new(features: [usize; 2], device: &B::Device) -> Self {
        let fc = LinearConfig::new(features[0], features[1]).init(device);
        let lrelu = LeakyReluConfig::new().with_negative_slope(0.2).init();

        Self { fc, lrelu }
    }

    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let output = self.fc.forward(input);
        self.lrelu.forward(output)
    }
}

/// Fully connected layer followed by a ReLU.
#[derive(Module, Debug)]
pub struct GenBlock<B: Backend> {
    fc: Linear<B>,
    relu: Relu,
}
impl<B: Backend> GenBlock<B> {
    pub fn new(features: [usize; 2], device: &B::Device) -> Self {
        let fc = LinearConfig::new(features[0], features[1]).init(device);
        let relu = Relu::new();

        Self { fc, relu }
    }

    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let output = self.fc.forward(input);
        self.relu.forward(output)
    }
}
