use burn::prelude::*;

use crate::{
    error::{Error, Result},
    model::vgg19::{layer_index, Vgg19, VGG19_FEATURES},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    Style,
    Content,
}

/// A VGG layer whose activation is captured during the forward pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerTap {
    pub index: usize,
    pub name: &'static str,
    pub role: LayerRole,
}

/// Resolves layer names to taps sorted by position in the network.
///
/// A name may appear in both lists; it is then captured once per role.
pub fn resolve_taps<S: AsRef<str>>(style: &[S], content: &[S]) -> Result<Vec<LayerTap>> {
    if style.is_empty() && content.is_empty() {
        return Err(Error::Config("no style or content layers given".into()));
    }

    let named = style
        .iter()
        .map(|name| (name.as_ref(), LayerRole::Style))
        .chain(content.iter().map(|name| (name.as_ref(), LayerRole::Content)));

    let mut taps = Vec::new();
    for (name, role) in named {
        let index = layer_index(name)
            .ok_or_else(|| Error::Config(format!("unknown VGG19 layer `{name}`")))?;
        taps.push(LayerTap {
            index,
            name: VGG19_FEATURES[index].name,
            role,
        });
    }
    taps.sort_by_key(|tap| tap.index);
    taps.dedup();

    Ok(taps)
}

#[derive(Debug, Clone)]
pub struct Features<B: Backend> {
    /// One activation per style tap, in layer order
    pub styles: Vec<Tensor<B, 4>>,
    /// One activation per content tap, in layer order
    pub contents: Vec<Tensor<B, 4>>,
}

/// VGG19 truncated after the deepest tapped layer.
#[derive(Debug)]
pub struct FeatureExtractor<B: Backend> {
    vgg: Vgg19<B>,
    taps: Vec<LayerTap>,
}

impl<B: Backend> FeatureExtractor<B> {
    pub fn new(vgg: Vgg19<B>, taps: Vec<LayerTap>) -> Self {
        Self { vgg, taps }
    }

    pub fn taps(&self) -> &[LayerTap] {
        &self.taps
    }

    /// Number of raw layers actually evaluated.
    pub fn depth(&self) -> usize {
        self.taps.iter().map(|tap| tap.index + 1).max().unwrap_or(0)
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Features<B> {
        let mut styles = Vec::new();
        let mut contents = Vec::new();

        let mut output = input;
        for index in 0..self.depth() {
            output = self.vgg.layer_forward(index, output);

            for tap in self.taps.iter().filter(|tap| tap.index == index) {
                match tap.role {
                    LayerRole::Style => styles.push(output.clone()),
                    LayerRole::Content => contents.push(output.clone()),
                }
            }
        }

        Features { styles, contents }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestBackend;

    #[test]
    fn test_resolve_default_layers() {
        let taps = resolve_taps(
            &["conv1_1", "conv2_1", "conv3_1", "conv4_1", "conv5_1"],
            &["conv4_4"],
        )
        .unwrap();

        let indices = taps.iter().map(|tap| tap.index).collect::<Vec<_>>();
        assert_eq!(indices, vec![0, 5, 10, 19, 25, 28]);
        assert_eq!(taps[4].role, LayerRole::Content);
        assert_eq!(taps[4].name, "conv4_4");
    }

    #[test]
    fn test_resolve_rejects_unknown_layer() {
        let result = resolve_taps(&["conv9_9"], &["conv4_4"]);

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_resolve_rejects_empty() {
        let empty: [&str; 0] = [];

        assert!(resolve_taps(&empty, &empty).is_err());
    }

    #[test]
    fn test_forward_truncates_and_orders_features() {
        let device = Default::default();
        let taps =
            resolve_taps(&["conv2_1", "conv1_1"], &["relu1_2", "conv1_1"]).unwrap();
        let extractor = FeatureExtractor::new(Vgg19::<TestBackend>::new(&device), taps);

        assert_eq!(extractor.depth(), 6);

        let input = Tensor::<TestBackend, 4>::ones([1, 3, 8, 8], &device);
        let features = extractor.forward(input);

        // styles in layer order: conv1_1 then conv2_1 (after pool1)
        assert_eq!(features.styles.len(), 2);
        assert_eq!(features.styles[0].dims(), [1, 64, 8, 8]);
        assert_eq!(features.styles[1].dims(), [1, 128, 4, 4]);

        // conv1_1 is shared between both roles
        assert_eq!(features.contents.len(), 2);
        let shared = (features.contents[0].clone() - features.styles[0].clone())
            .abs()
            .max()
            .into_scalar();
        assert_eq!(shared, 0.0);
        assert!(features.contents[1].clone().min().into_scalar() >= 0.0);
    }
}
