//! Frozen parameter sets.
//!
//! A [`ParameterSet`] holds exactly four dense layers whose dimensions chain
//! (`layer[i].out_dim == layer[i + 1].in_dim`). It is validated once on
//! construction and never mutated afterwards.
//!
//! Parameters usually arrive as a *bundle*: a map from names like `"fc1.weight"`
//! and `"fc1.bias"` to [`Tensor`]s. Weights have shape `(in_dim, out_dim)` and
//! biases have shape `(out_dim,)`.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Error, Layer, Result};

/// Number of dense layers in the classifier.
pub const NUM_LAYERS: usize = 4;

/// Bundle key prefixes, in forward order.
pub const LAYER_NAMES: [&str; NUM_LAYERS] = ["fc1", "fc2", "fc3", "fc4"];

/// A dense array: a shape plus row-major data.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected = shape
            .iter()
            .try_fold(1_usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| Error::Shape(format!("tensor shape {shape:?} overflows")))?;
        if data.len() != expected {
            return Err(Error::Shape(format!(
                "tensor data length {} does not match shape {shape:?}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    layers: [Layer; NUM_LAYERS],
}

impl ParameterSet {
    /// Build from four layers, checking that their dimensions chain.
    pub fn new(layers: [Layer; NUM_LAYERS]) -> Result<Self> {
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[0].out_dim() != pair[1].in_dim() {
                return Err(Error::Shape(format!(
                    "{} out_dim {} does not match {} in_dim {}",
                    LAYER_NAMES[i],
                    pair[0].out_dim(),
                    LAYER_NAMES[i + 1],
                    pair[1].in_dim()
                )));
            }
        }
        Ok(Self { layers })
    }

    /// Build from a named bundle (`"fc1.weight"`, `"fc1.bias"`, ... `"fc4.bias"`).
    ///
    /// Missing keys are [`Error::InvalidData`]; wrong ranks, lengths or broken
    /// dimension chaining are [`Error::Shape`]. Unknown keys are ignored.
    pub fn from_bundle(mut bundle: HashMap<String, Tensor>) -> Result<Self> {
        let mut layers = Vec::with_capacity(NUM_LAYERS);

        for name in LAYER_NAMES {
            let weight = take(&mut bundle, &format!("{name}.weight"))?;
            let bias = take(&mut bundle, &format!("{name}.bias"))?;

            let (in_dim, out_dim) = match *weight.shape() {
                [in_dim, out_dim] => (in_dim, out_dim),
                ref other => {
                    return Err(Error::Shape(format!(
                        "{name}.weight must be 2-D (in_dim, out_dim), got shape {other:?}"
                    )));
                }
            };
            if bias.shape() != [out_dim] {
                return Err(Error::Shape(format!(
                    "{name}.bias shape {:?} does not match ({out_dim},)",
                    bias.shape()
                )));
            }

            let layer = Layer::from_parts(in_dim, out_dim, weight.into_data(), bias.into_data())
                .map_err(|e| match e {
                    Error::Shape(msg) => Error::Shape(format!("{name}: {msg}")),
                    Error::InvalidData(msg) => Error::InvalidData(format!("{name}: {msg}")),
                    other => other,
                })?;
            layers.push(layer);
        }

        if !bundle.is_empty() {
            let mut extra: Vec<&str> = bundle.keys().map(String::as_str).collect();
            extra.sort_unstable();
            tracing::debug!(keys = ?extra, "ignoring unknown parameter bundle keys");
        }

        let layers: [Layer; NUM_LAYERS] = layers
            .try_into()
            .map_err(|_| Error::Shape(format!("expected {NUM_LAYERS} layers")))?;
        Self::new(layers)
    }

    /// The inverse of [`ParameterSet::from_bundle`].
    pub fn to_bundle(&self) -> HashMap<String, Tensor> {
        let mut bundle = HashMap::with_capacity(2 * NUM_LAYERS);
        for (name, layer) in LAYER_NAMES.iter().zip(&self.layers) {
            bundle.insert(
                format!("{name}.weight"),
                Tensor {
                    shape: vec![layer.in_dim(), layer.out_dim()],
                    data: layer.weights().to_vec(),
                },
            );
            bundle.insert(
                format!("{name}.bias"),
                Tensor {
                    shape: vec![layer.out_dim()],
                    data: layer.biases().to_vec(),
                },
            );
        }
        bundle
    }

    /// Random synthetic parameters with the given layer sizes
    /// (`input, h1, h2, h3, classes`).
    pub fn new_with_seed(sizes: [usize; NUM_LAYERS + 1], seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(sizes, &mut rng)
    }

    pub fn new_with_rng<R: Rng + ?Sized>(
        sizes: [usize; NUM_LAYERS + 1],
        rng: &mut R,
    ) -> Result<Self> {
        let mut layers = Vec::with_capacity(NUM_LAYERS);
        for w in sizes.windows(2) {
            layers.push(Layer::new_with_rng(w[0], w[1], rng)?);
        }
        let layers: [Layer; NUM_LAYERS] = layers
            .try_into()
            .map_err(|_| Error::Shape(format!("expected {NUM_LAYERS} layers")))?;
        Self::new(layers)
    }

    #[inline]
    pub fn layers(&self) -> &[Layer; NUM_LAYERS] {
        &self.layers
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.layers[0].in_dim()
    }

    /// Number of output classes.
    #[inline]
    pub fn output_dim(&self) -> usize {
        self.layers[NUM_LAYERS - 1].out_dim()
    }
}

fn take(bundle: &mut HashMap<String, Tensor>, key: &str) -> Result<Tensor> {
    bundle
        .remove(key)
        .ok_or_else(|| Error::InvalidData(format!("parameter bundle is missing {key:?}")))
}
