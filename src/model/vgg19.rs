// Feature stack of VGG19. Field names follow the burn-import output for
// "models/vgg19.onnx" so the converted record loads directly; the classifier
// head stored in that record is not used.
use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        PaddingConfig2d,
    },
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::{backend::Backend, Tensor},
};
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Index into the 16 convolutions.
    Conv(usize),
    Relu,
    /// Index into the 5 max pools.
    Pool(usize),
}

/// One raw layer of the VGG19 feature stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VggLayer {
    pub name: &'static str,
    pub kind: LayerKind,
}

const fn conv(name: &'static str, index: usize) -> VggLayer {
    VggLayer {
        name,
        kind: LayerKind::Conv(index),
    }
}

const fn relu(name: &'static str) -> VggLayer {
    VggLayer {
        name,
        kind: LayerKind::Relu,
    }
}

const fn pool(name: &'static str, index: usize) -> VggLayer {
    VggLayer {
        name,
        kind: LayerKind::Pool(index),
    }
}

/// Raw layers in execution order. Positions match torchvision's
/// `vgg19().features` indices.
pub const VGG19_FEATURES: [VggLayer; 37] = [
    conv("conv1_1", 0),
    relu("relu1_1"),
    conv("conv1_2", 1),
    relu("relu1_2"),
    pool("pool1", 0),
    conv("conv2_1", 2),
    relu("relu2_1"),
    conv("conv2_2", 3),
    relu("relu2_2"),
    pool("pool2", 1),
    conv("conv3_1", 4),
    relu("relu3_1"),
    conv("conv3_2", 5),
    relu("relu3_2"),
    conv("conv3_3", 6),
    relu("relu3_3"),
    conv("conv3_4", 7),
    relu("relu3_4"),
    pool("pool3", 2),
    conv("conv4_1", 8),
    relu("relu4_1"),
    conv("conv4_2", 9),
    relu("relu4_2"),
    conv("conv4_3", 10),
    relu("relu4_3"),
    conv("conv4_4", 11),
    relu("relu4_4"),
    pool("pool4", 3),
    conv("conv5_1", 12),
    relu("relu5_1"),
    conv("conv5_2", 13),
    relu("relu5_2"),
    conv("conv5_3", 14),
    relu("relu5_3"),
    conv("conv5_4", 15),
    relu("relu5_4"),
    pool("pool5", 4),
];

/// Position of a named layer in [`VGG19_FEATURES`].
pub fn layer_index(name: &str) -> Option<usize> {
    VGG19_FEATURES.iter().position(|layer| layer.name == name)
}

#[derive(Module, Debug)]
pub struct Vgg19<B: Backend> {
    conv2d1: Conv2d<B>,
    conv2d2: Conv2d<B>,
    maxpool2d1: MaxPool2d,
    conv2d3: Conv2d<B>,
    conv2d4: Conv2d<B>,
    maxpool2d2: MaxPool2d,
    conv2d5: Conv2d<B>,
    conv2d6: Conv2d<B>,
    conv2d7: Conv2d<B>,
    conv2d8: Conv2d<B>,
    maxpool2d3: MaxPool2d,
    conv2d9: Conv2d<B>,
    conv2d10: Conv2d<B>,
    conv2d11: Conv2d<B>,
    conv2d12: Conv2d<B>,
    maxpool2d4: MaxPool2d,
    conv2d13: Conv2d<B>,
    conv2d14: Conv2d<B>,
    conv2d15: Conv2d<B>,
    conv2d16: Conv2d<B>,
    maxpool2d5: MaxPool2d,
}

fn conv3x3<B: Backend>(channels: [usize; 2], device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new(channels, [3, 3])
        .with_stride([1, 1])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .with_bias(true)
        .init(device)
}

fn maxpool2x2() -> MaxPool2d {
    MaxPool2dConfig::new([2, 2])
        .with_strides([2, 2])
        .with_padding(PaddingConfig2d::Valid)
        .init()
}

impl<B: Backend> Vgg19<B> {
    /// Loads pretrained weights from a burn record (path without extension).
    pub fn from_file<P: AsRef<Path>>(file: P, device: &B::Device) -> Result<Self> {
        let record = NamedMpkFileRecorder::<FullPrecisionSettings>::new()
            .load(file.as_ref().to_path_buf(), device)?;
        Ok(Self::new(device).load_record(record))
    }

    /// Randomly initialised network with the VGG19 layout.
    pub fn new(device: &B::Device) -> Self {
        Self {
            conv2d1: conv3x3([3, 64], device),
            conv2d2: conv3x3([64, 64], device),
            maxpool2d1: maxpool2x2(),
            conv2d3: conv3x3([64, 128], device),
            conv2d4: conv3x3([128, 128], device),
            maxpool2d2: maxpool2x2(),
            conv2d5: conv3x3([128, 256], device),
            conv2d6: conv3x3([256, 256], device),
            conv2d7: conv3x3([256, 256], device),
            conv2d8: conv3x3([256, 256], device),
            maxpool2d3: maxpool2x2(),
            conv2d9: conv3x3([256, 512], device),
            conv2d10: conv3x3([512, 512], device),
            conv2d11: conv3x3([512, 512], device),
            conv2d12: conv3x3([512, 512], device),
            maxpool2d4: maxpool2x2(),
            conv2d13: conv3x3([512, 512], device),
            conv2d14: conv3x3([512, 512], device),
            conv2d15: conv3x3([512, 512], device),
            conv2d16: conv3x3([512, 512], device),
            maxpool2d5: maxpool2x2(),
        }
    }

    fn conv(&self, index: usize) -> &Conv2d<B> {
        [
            &self.conv2d1,
            &self.conv2d2,
            &self.conv2d3,
            &self.conv2d4,
            &self.conv2d5,
            &self.conv2d6,
            &self.conv2d7,
            &self.conv2d8,
            &self.conv2d9,
            &self.conv2d10,
            &self.conv2d11,
            &self.conv2d12,
            &self.conv2d13,
            &self.conv2d14,
            &self.conv2d15,
            &self.conv2d16,
        ][index]
    }

    fn pool(&self, index: usize) -> &MaxPool2d {
        [
            &self.maxpool2d1,
            &self.maxpool2d2,
            &self.maxpool2d3,
            &self.maxpool2d4,
            &self.maxpool2d5,
        ][index]
    }

    /// Applies raw layer `index` of [`VGG19_FEATURES`].
    pub fn layer_forward(&self, index: usize, input: Tensor<B, 4>) -> Tensor<B, 4> {
        match VGG19_FEATURES[index].kind {
            LayerKind::Conv(conv) => self.conv(conv).forward(input),
            LayerKind::Relu => burn::tensor::activation::relu(input),
            LayerKind::Pool(pool) => self.pool(pool).forward(input),
        }
    }
}
