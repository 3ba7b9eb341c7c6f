use burn::prelude::*;
use image::{imageops::FilterType, Rgb, RgbImage};
use std::path::Path;

use crate::error::{Error, Result};

/// Per-channel mean/std pair used to move images in and out of feature space.
///
/// The same instance must be used for both directions; mixing pairs silently
/// skews every loss computed on the features.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

/// ImageNet statistics the VGG19 weights were trained with.
pub const IMAGENET: Normalizer = Normalizer {
    mean: [0.485, 0.456, 0.406],
    std: [0.229, 0.224, 0.225],
};

impl Normalizer {
    fn stats<B: Backend>(&self, device: &B::Device) -> (Tensor<B, 4>, Tensor<B, 4>) {
        let mean = Tensor::<B, 1>::from_floats(self.mean, device).reshape([1, 3, 1, 1]);
        let std = Tensor::<B, 1>::from_floats(self.std, device).reshape([1, 3, 1, 1]);
        (mean, std)
    }

    /// `[N, 3, H, W]` in `[0, 1]` to feature space.
    pub fn normalize<B: Backend>(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let (mean, std) = self.stats(&input.device());
        (input - mean) / std
    }

    /// Feature space back to `[0, 1]`, clamped.
    pub fn denormalize<B: Backend>(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let (mean, std) = self.stats(&input.device());
        (input * std + mean).clamp(0.0, 1.0)
    }
}

/// Maps generator output in `[-1, 1]` back to displayable `[0, 1]`.
pub fn denorm_tanh<B: Backend, const D: usize>(input: Tensor<B, D>) -> Tensor<B, D> {
    ((input + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Scales `(width, height)` down so the longest side is at most `max_size`.
pub fn fit_within(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_size {
        return (width, height);
    }
    let scale = max_size as f32 / longest as f32;
    let width = ((width as f32 * scale) as u32).max(1);
    let height = ((height as f32 * scale) as u32).max(1);
    (width, height)
}

pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    Ok(image::open(path)?.to_rgb8())
}

pub fn resize_image(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    image::imageops::resize(image, width, height, FilterType::Triangle)
}

/// RGB image to a `[1, 3, H, W]` tensor in `[0, 1]`.
pub fn image_to_tensor<B: Backend>(image: &RgbImage, device: &B::Device) -> Tensor<B, 4> {
    let (width, height) = image.dimensions();
    let data = image
        .as_raw()
        .iter()
        .map(|&c| c as f32 / 255.0)
        .collect::<Vec<_>>();

    Tensor::<B, 3>::from_data(
        TensorData::new(data, [height as usize, width as usize, 3]),
        device,
    )
    .permute([2, 0, 1])
    .unsqueeze()
}

/// `[C, H, W]` tensor in `[0, 1]` to an RGB image. Single-channel input is
/// replicated to grey.
pub fn tensor_to_image<B: Backend>(image: Tensor<B, 3>) -> Result<RgbImage> {
    let [channels, height, width] = image.dims();
    if channels != 1 && channels != 3 {
        return Err(Error::Config(format!(
            "expected 1 or 3 channels, got {channels}"
        )));
    }

    let pixels = image
        .clamp(0.0, 1.0)
        .permute([1, 2, 0])
        .into_data()
        .to_vec::<f32>()
        .map_err(|err| Error::Tensor(format!("{err:?}")))?;

    let mut imgbuf = RgbImage::new(width as u32, height as u32);
    for (i, pixel) in pixels.chunks(channels).enumerate() {
        let rgb = match pixel {
            [l] => [to_u8(*l); 3],
            [r, g, b] => [to_u8(*r), to_u8(*g), to_u8(*b)],
            _ => unreachable!(),
        };
        let x = (i % width) as u32;
        let y = (i / width) as u32;
        imgbuf.put_pixel(x, y, Rgb(rgb));
    }
    Ok(imgbuf)
}

fn to_u8(value: f32) -> u8 {
    // +0.5 rounds to nearest, as torchvision's save_image does
    (value * 255.0 + 0.5).clamp(0.0, 255.0) as u8
}

/// Lays `[N, C, H, W]` images in `[0, 1]` out on a grid with `nrow` images per
/// row and a 2 pixel border.
pub fn image_grid<B: Backend>(images: Tensor<B, 4>, nrow: usize) -> Result<RgbImage> {
    const PADDING: u32 = 2;

    let [count, _, height, width] = images.dims();
    let xmaps = nrow.min(count).max(1);
    let ymaps = count.div_ceil(xmaps);
    let cell_w = width as u32 + PADDING;
    let cell_h = height as u32 + PADDING;

    let mut imgbuf = RgbImage::new(
        xmaps as u32 * cell_w + PADDING,
        ymaps as u32 * cell_h + PADDING,
    );
    for index in 0..count {
        let image: Tensor<B, 3> = images.clone().slice([index..index + 1]).squeeze(0);
        let image = tensor_to_image(image)?;

        let col = (index % xmaps) as u32;
        let row = (index / xmaps) as u32;
        for (x, y, pixel) in image.enumerate_pixels() {
            imgbuf.put_pixel(
                col * cell_w + PADDING + x,
                row * cell_h + PADDING + y,
                *pixel,
            );
        }
    }
    Ok(imgbuf)
}

pub fn save_image<B: Backend, Q: AsRef<Path>>(
    images: Tensor<B, 4>,
    nrow: usize,
    path: Q,
) -> Result<()> {
    image_grid(images, nrow)?.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestBackend;

    #[test]
    fn test_normalize_denormalize_inverse() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::from_floats(
            [[
                [[0.0, 0.25], [0.5, 1.0]],
                [[0.1, 0.2], [0.3, 0.4]],
                [[0.9, 0.8], [0.7, 0.6]],
            ]],
            &device,
        );

        let output = IMAGENET.denormalize(IMAGENET.normalize(input.clone()));

        let max_diff = (output - input).abs().max().into_scalar();
        assert!(max_diff < 1e-5, "max diff {max_diff}");
    }

    #[test]
    fn test_denormalize_clamps() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::full([1, 3, 2, 2], 100.0, &device);

        let output = IMAGENET.denormalize(input);

        assert_eq!(output.max().into_scalar(), 1.0);
    }

    #[test]
    fn test_denorm_tanh_range() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 1>::from_floats([-1.0, 0.0, 1.0, 3.0], &device);

        let output = denorm_tanh(input).into_data().to_vec::<f32>().unwrap();

        assert_eq!(output, vec![0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(300, 200, 600), (300, 200));
        assert_eq!(fit_within(1200, 800, 600), (600, 400));
        assert_eq!(fit_within(100, 1000, 50), (5, 50));
    }

    #[test]
    fn test_image_tensor_conversion() {
        let device = Default::default();
        let mut image = RgbImage::new(3, 2);
        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        image.put_pixel(2, 1, Rgb([0, 0, 255]));

        let tensor = image_to_tensor::<TestBackend>(&image, &device);
        assert_eq!(tensor.dims(), [1, 3, 2, 3]);

        let restored = tensor_to_image(tensor.squeeze(0)).unwrap();
        assert_eq!(restored, image);
    }

    #[test]
    fn test_image_grid_layout() {
        let device = Default::default();
        let images = Tensor::<TestBackend, 4>::ones([5, 1, 4, 4], &device);

        let grid = image_grid(images, 2).unwrap();

        // 2 columns, 3 rows of 4x4 cells with a 2 pixel border
        assert_eq!(grid.dimensions(), (2 * 6 + 2, 3 * 6 + 2));
        assert_eq!(*grid.get_pixel(2, 2), Rgb([255, 255, 255]));
        assert_eq!(*grid.get_pixel(0, 0), Rgb([0, 0, 0]));
        // the sixth cell is empty
        assert_eq!(*grid.get_pixel(8, 14), Rgb([0, 0, 0]));
    }
}
