use burn::{
    nn::loss::{MseLoss, Reduction},
    prelude::*,
};

use crate::model::features::Features;

/// Channel covariance of a `[1, C, H, W]` activation, scaled by `C * H * W`.
pub fn gram<B: Backend>(input: Tensor<B, 4>) -> Tensor<B, 2> {
    let [_, channels, height, width] = input.dims();
    let flat = input.reshape([channels, height * width]);

    flat.clone()
        .matmul(flat.transpose())
        .div_scalar((channels * height * width) as f32)
}

pub fn content_loss<B: Backend>(y_hat: Tensor<B, 4>, y: Tensor<B, 4>) -> Tensor<B, 1> {
    MseLoss::new().forward(y_hat, y, Reduction::Mean)
}

pub fn style_loss<B: Backend>(y_hat: Tensor<B, 4>, gram_y: Tensor<B, 2>) -> Tensor<B, 1> {
    MseLoss::new().forward(gram(y_hat), gram_y, Reduction::Mean)
}

/// Half the sum of the mean absolute vertical and horizontal neighbour
/// differences. A direction of extent 1 contributes nothing.
pub fn tv_loss<B: Backend>(y_hat: Tensor<B, 4>) -> Tensor<B, 1> {
    let [batch, channels, height, width] = y_hat.dims();
    let device = y_hat.device();

    let vertical = if height > 1 {
        let below = y_hat.clone().slice([0..batch, 0..channels, 1..height, 0..width]);
        let above = y_hat.clone().slice([0..batch, 0..channels, 0..height - 1, 0..width]);
        (below - above).abs().mean()
    } else {
        Tensor::zeros([1], &device)
    };

    let horizontal = if width > 1 {
        let right = y_hat.clone().slice([0..batch, 0..channels, 0..height, 1..width]);
        let left = y_hat.slice([0..batch, 0..channels, 0..height, 0..width - 1]);
        (right - left).abs().mean()
    } else {
        Tensor::zeros([1], &device)
    };

    (vertical + horizontal) * 0.5
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossWeights {
    pub content: f32,
    pub style: f32,
    pub tv: f32,
}

/// Fixed statistics of the reference images.
#[derive(Debug, Clone)]
pub struct Targets<B: Backend> {
    pub contents: Vec<Tensor<B, 4>>,
    pub style_grams: Vec<Tensor<B, 2>>,
}

impl<B: Backend> Targets<B> {
    /// Keeps the content activations of `content` and the Gram matrices of
    /// the style activations of `style`, detached from any graph.
    pub fn new(content: Features<B>, style: Features<B>) -> Self {
        let contents = content
            .contents
            .into_iter()
            .map(|feature| feature.detach())
            .collect();
        let style_grams = style
            .styles
            .into_iter()
            .map(|feature| gram(feature).detach())
            .collect();

        Self {
            contents,
            style_grams,
        }
    }
}

/// Weighted loss components; `total` is their sum.
#[derive(Debug, Clone)]
pub struct TransferLoss<B: Backend> {
    pub content: Tensor<B, 1>,
    pub style: Tensor<B, 1>,
    pub tv: Tensor<B, 1>,
    pub total: Tensor<B, 1>,
}

fn sum_losses<B: Backend>(losses: Vec<Tensor<B, 1>>, device: &B::Device) -> Tensor<B, 1> {
    losses
        .into_iter()
        .fold(Tensor::zeros([1], device), |acc, loss| acc + loss)
}

pub fn compute_loss<B: Backend>(
    image: Tensor<B, 4>,
    features: Features<B>,
    targets: &Targets<B>,
    weights: &LossWeights,
) -> TransferLoss<B> {
    let device = image.device();

    let contents = features
        .contents
        .into_iter()
        .zip(targets.contents.iter())
        .map(|(y_hat, y)| content_loss(y_hat, y.clone()))
        .collect();
    let styles = features
        .styles
        .into_iter()
        .zip(targets.style_grams.iter())
        .map(|(y_hat, gram_y)| style_loss(y_hat, gram_y.clone()))
        .collect();

    let content = sum_losses(contents, &device) * weights.content;
    let style = sum_losses(styles, &device) * weights.style;
    let tv = tv_loss(image) * weights.tv;
    let total = content.clone() + style.clone() + tv.clone();

    TransferLoss {
        content,
        style,
        tv,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestBackend;
    use burn::tensor::Distribution;

    #[test]
    fn test_gram_is_symmetric() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::random(
            [1, 6, 5, 7],
            Distribution::Normal(0.0, 1.0),
            &device,
        );

        let gram = gram(input);

        assert_eq!(gram.dims(), [6, 6]);
        let asymmetry = (gram.clone() - gram.transpose())
            .abs()
            .max()
            .into_scalar();
        assert!(asymmetry < 1e-6, "asymmetry {asymmetry}");
    }

    #[test]
    fn test_gram_normalization() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::ones([1, 2, 3, 3], &device);

        let values = gram(input).into_data().to_vec::<f32>().unwrap();

        // each entry is 9 / (2 * 9)
        assert!(values.iter().all(|v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_content_loss_is_mse() {
        let device = Default::default();
        let y_hat = Tensor::<TestBackend, 4>::full([1, 2, 2, 2], 3.0, &device);
        let y = Tensor::<TestBackend, 4>::full([1, 2, 2, 2], 1.0, &device);

        assert_eq!(content_loss(y_hat, y).into_scalar(), 4.0);
    }

    #[test]
    fn test_style_loss_zero_for_identical_activations() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::random(
            [1, 4, 3, 3],
            Distribution::Normal(0.0, 1.0),
            &device,
        );

        let loss = style_loss(input.clone(), gram(input)).into_scalar();

        assert!(loss.abs() < 1e-10, "loss {loss}");
    }

    #[test]
    fn test_style_loss_grows_with_perturbation() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::random(
            [1, 4, 3, 3],
            Distribution::Uniform(0.5, 1.0),
            &device,
        );
        let target = gram(input.clone());

        let losses = [0.1, 0.5, 1.0, 2.0]
            .iter()
            .map(|&delta| style_loss(input.clone() + delta, target.clone()).into_scalar())
            .collect::<Vec<_>>();

        assert!(losses[0] > 0.0);
        assert!(losses.windows(2).all(|pair| pair[0] < pair[1]), "{losses:?}");
    }

    #[test]
    fn test_tv_loss_zero_for_constant_image() {
        let device = Default::default();
        let image = Tensor::<TestBackend, 4>::full([1, 3, 4, 5], 0.3, &device);

        assert_eq!(tv_loss(image).into_scalar(), 0.0);
    }

    #[test]
    fn test_tv_loss_positive_for_single_difference() {
        let device = Default::default();
        let image = Tensor::<TestBackend, 4>::zeros([1, 1, 3, 3], &device);
        let image = image.slice_assign(
            [0..1, 0..1, 1..2, 1..2],
            Tensor::ones([1, 1, 1, 1], &device),
        );

        let loss = tv_loss(image).into_scalar();

        // 2 of 6 vertical and 2 of 6 horizontal pairs differ by 1
        assert!((loss - 1.0 / 3.0).abs() < 1e-6, "loss {loss}");
    }

    #[test]
    fn test_tv_loss_single_pixel() {
        let device = Default::default();
        let image = Tensor::<TestBackend, 4>::full([1, 3, 1, 1], 0.7, &device);

        assert_eq!(tv_loss(image).into_scalar(), 0.0);
    }

    #[test]
    fn test_compute_loss_applies_weights() {
        let device = Default::default();
        let image = Tensor::<TestBackend, 4>::zeros([1, 1, 2, 2], &device);
        let image = image.slice_assign(
            [0..1, 0..1, 0..1, 0..1],
            Tensor::ones([1, 1, 1, 1], &device),
        );

        let activation = Tensor::<TestBackend, 4>::ones([1, 2, 2, 2], &device);
        let targets = Targets {
            contents: vec![activation.clone() * 2.0],
            style_grams: vec![gram(activation.clone())],
        };
        let features = Features {
            styles: vec![activation.clone()],
            contents: vec![activation],
        };
        let weights = LossWeights {
            content: 2.0,
            style: 1000.0,
            tv: 10.0,
        };

        let loss = compute_loss(image, features, &targets, &weights);

        assert_eq!(loss.content.into_scalar(), 2.0);
        assert_eq!(loss.style.into_scalar(), 0.0);
        // vertical 0.5, horizontal 0.5 -> 0.5 * 1.0 * 10
        assert!((loss.tv.into_scalar() - 5.0).abs() < 1e-6);
        assert!((loss.total.into_scalar() - 7.0).abs() < 1e-6);
    }
}
