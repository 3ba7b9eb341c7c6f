use burn::{module::Param, prelude::*};

/// The synthesized image: the only trainable tensor of a style transfer run.
#[derive(Module, Debug)]
pub struct Canvas<B: Backend> {
    pixels: Param<Tensor<B, 4>>,
}

impl<B: Backend> Canvas<B> {
    /// Starts from a copy of `image` (`[1, 3, H, W]`, normalized).
    pub fn new(image: Tensor<B, 4>) -> Self {
        Self {
            pixels: Param::from_tensor(image.detach()),
        }
    }

    pub fn forward(&self) -> Tensor<B, 4> {
        self.pixels.val()
    }
}
