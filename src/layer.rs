use rand::Rng;

use crate::matmul::{vec_mat_acc, vec_mat_t};
use crate::{Error, Result};

/// A frozen fully-connected layer.
///
/// There is no activation here: the classifier applies ReLU (hidden layers) or
/// softmax (output layer) on top of the affine map, and keeps the pre-activation
/// for the backward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    in_dim: usize,
    out_dim: usize,
    /// Row-major matrix with shape (in_dim, out_dim).
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl Layer {
    /// Build a layer from raw parameters.
    ///
    /// `weights` is row-major `(in_dim, out_dim)` so that `z = x·W + b`.
    pub fn from_parts(
        in_dim: usize,
        out_dim: usize,
        weights: Vec<f32>,
        biases: Vec<f32>,
    ) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::Shape(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }

        let expected_w = in_dim
            .checked_mul(out_dim)
            .ok_or_else(|| Error::Shape("layer weight shape overflow".to_owned()))?;
        if weights.len() != expected_w {
            return Err(Error::Shape(format!(
                "weights length {} does not match in_dim * out_dim ({in_dim} * {out_dim})",
                weights.len()
            )));
        }
        if biases.len() != out_dim {
            return Err(Error::Shape(format!(
                "biases length {} does not match out_dim {out_dim}",
                biases.len()
            )));
        }

        if weights.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "weights must contain only finite values".to_owned(),
            ));
        }
        if biases.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "biases must contain only finite values".to_owned(),
            ));
        }

        Ok(Self {
            in_dim,
            out_dim,
            weights,
            biases,
        })
    }

    /// He-uniform weights and zero biases.
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::Shape(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }

        let limit = (6.0 / in_dim as f32).sqrt();
        let weights = (0..in_dim * out_dim)
            .map(|_| rng.gen_range(-limit..limit))
            .collect();

        Ok(Self {
            in_dim,
            out_dim,
            weights,
            biases: vec![0.0; out_dim],
        })
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    #[inline]
    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    /// Affine forward pass for a single sample: `z = inputs·W + b`.
    ///
    /// Shape contract:
    /// - `inputs.len() == self.in_dim`
    /// - `z.len() == self.out_dim`
    #[inline]
    pub fn forward(&self, inputs: &[f32], z: &mut [f32]) {
        debug_assert_eq!(inputs.len(), self.in_dim);
        debug_assert_eq!(z.len(), self.out_dim);

        z.copy_from_slice(&self.biases);
        vec_mat_acc(inputs, &self.weights, self.in_dim, self.out_dim, z);
    }

    /// Gradient w.r.t the layer input: `d_inputs = d_z·Wᵀ`.
    ///
    /// Weights are frozen, so no parameter gradients are produced. `d_inputs` is
    /// overwritten.
    ///
    /// Shape contract:
    /// - `d_z.len() == self.out_dim`
    /// - `d_inputs.len() == self.in_dim`
    #[inline]
    pub fn backward_input(&self, d_z: &[f32], d_inputs: &mut [f32]) {
        debug_assert_eq!(d_z.len(), self.out_dim);
        debug_assert_eq!(d_inputs.len(), self.in_dim);

        vec_mat_t(d_z, &self.weights, self.in_dim, self.out_dim, d_inputs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn layer_2x3() -> Layer {
        Layer::from_parts(
            2,
            3,
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![0.1, 0.2, 0.3],
        )
        .unwrap()
    }

    #[test]
    fn from_parts_validates_lengths() {
        assert!(matches!(
            Layer::from_parts(2, 3, vec![0.0; 5], vec![0.0; 3]),
            Err(Error::Shape(_))
        ));
        assert!(matches!(
            Layer::from_parts(2, 3, vec![0.0; 6], vec![0.0; 2]),
            Err(Error::Shape(_))
        ));
        assert!(matches!(
            Layer::from_parts(0, 3, vec![], vec![0.0; 3]),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn from_parts_rejects_non_finite_parameters() {
        let mut w = vec![0.0; 6];
        w[4] = f32::NAN;
        assert!(matches!(
            Layer::from_parts(2, 3, w, vec![0.0; 3]),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn forward_is_row_vector_times_weights_plus_bias() {
        let layer = layer_2x3();
        let mut z = [0.0_f32; 3];
        layer.forward(&[1.0, 2.0], &mut z);
        // [1*1 + 2*4, 1*2 + 2*5, 1*3 + 2*6] + b
        assert!((z[0] - 9.1).abs() < 1e-5);
        assert!((z[1] - 12.2).abs() < 1e-5);
        assert!((z[2] - 15.3).abs() < 1e-5);
    }

    #[test]
    fn backward_input_uses_weight_transpose() {
        let layer = layer_2x3();
        let mut d_in = [0.0_f32; 2];
        layer.backward_input(&[1.0, 1.0, 1.0], &mut d_in);
        assert_eq!(d_in, [6.0, 15.0]);
    }

    #[test]
    fn seeded_init_is_deterministic_and_bounded() {
        let a = Layer::new_with_rng(4, 3, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = Layer::new_with_rng(4, 3, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);

        let limit = (6.0_f32 / 4.0).sqrt();
        assert!(a.weights().iter().all(|w| w.abs() <= limit));
        assert!(a.biases().iter().all(|&b| b == 0.0));
    }
}
