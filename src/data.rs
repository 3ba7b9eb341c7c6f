use burn::{
    data::{dataloader::batcher::Batcher, dataset::vision::MnistItem},
    prelude::*,
};

/// Flattened pixel count of one MNIST digit.
pub const MNIST_PIXELS: usize = 28 * 28;

// ////////////////////////////////////////////////////////////////////////////
// Batcher
#[derive(Debug, Clone)]
pub struct MnistBatch<B: Backend> {
    /// `[size, 784]`, scaled to `[-1, 1]` to match the generator's tanh range
    pub images: Tensor<B, 2>,
    pub size: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MnistBatcher {}
impl MnistBatcher {
    pub fn new() -> Self {
        Self {}
    }
}
impl<B: Backend> Batcher<B, MnistItem, MnistBatch<B>> for MnistBatcher {
    fn batch(&self, items: Vec<MnistItem>, device: &B::Device) -> MnistBatch<B> {
        let images = items
            .iter()
            .map(|item| TensorData::from(item.image).convert::<B::FloatElem>())
            .map(|data| Tensor::<B, 2>::from_data(data, device))
            .map(|tensor| tensor.reshape([1, MNIST_PIXELS]))
            // [0, 255] -> [0, 1] -> [-1, 1]
            .map(|tensor| ((tensor / 255.0) - 0.5) / 0.5)
            .collect::<Vec<_>>();

        let images = Tensor::cat(images, 0);

        MnistBatch {
            images,
            size: items.len(),
        }
    }
}
