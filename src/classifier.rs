//! Frozen 4-layer classifier: forward pass, input gradients and FGSM.
//!
//! ```text
//! z1 = x·W1 + b1    h1 = relu(z1)
//! z2 = h1·W2 + b2   h2 = relu(z2)
//! z3 = h2·W3 + b3   h3 = relu(z3)
//! z4 = h3·W4 + b4   p  = softmax(z4)
//! ```
//!
//! [`Classifier::forward`] returns every intermediate in a [`ForwardState`] owned by
//! the caller. [`Classifier::gradient_with_state`] backpropagates through exactly
//! those cached values, so the classifier itself holds no per-call state and a
//! shared `&Classifier` can be used from many threads at once.

use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::activation::{argmax, relu_into, relu_mask_into, sign, softmax_into};
use crate::loss::{cross_entropy, softmax_cross_entropy_backward};
use crate::params::{NUM_LAYERS, Tensor};
use crate::{Error, ParameterSet, Result};

/// Number of ReLU layers (every layer but the output layer).
pub const NUM_HIDDEN: usize = NUM_LAYERS - 1;

/// L∞ budget used when none is configured.
pub const DEFAULT_ATTACK_BUDGET: f32 = 0.1;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    /// L∞ bound on the FGSM perturbation. Must be finite and `>= 0`.
    pub attack_budget: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            attack_budget: DEFAULT_ATTACK_BUDGET,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(self) -> Result<()> {
        check_budget(self.attack_budget)
    }
}

/// Everything one forward pass computed.
///
/// Hidden layers are indexed `0..NUM_HIDDEN` (`0` is `z1`/`h1`).
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardState {
    pre_activations: [Vec<f32>; NUM_HIDDEN],
    activations: [Vec<f32>; NUM_HIDDEN],
    logits: Vec<f32>,
    probs: Vec<f32>,
    label: usize,
}

impl ForwardState {
    /// `z_{k+1}` (before ReLU).
    #[inline]
    pub fn pre_activation(&self, k: usize) -> Option<&[f32]> {
        self.pre_activations.get(k).map(Vec::as_slice)
    }

    /// `h_{k+1}` (after ReLU).
    #[inline]
    pub fn activation(&self, k: usize) -> Option<&[f32]> {
        self.activations.get(k).map(Vec::as_slice)
    }

    /// Output scores before softmax (`z4`).
    #[inline]
    pub fn logits(&self) -> &[f32] {
        &self.logits
    }

    #[inline]
    pub fn probs(&self) -> &[f32] {
        &self.probs
    }

    /// `argmax(probs)`, lowest index on ties.
    #[inline]
    pub fn predicted_label(&self) -> usize {
        self.label
    }
}

/// A classifier over a frozen [`ParameterSet`].
///
/// Starts without parameters; every evaluation fails with [`Error::NotReady`]
/// until [`Classifier::load_parameters`] (or [`Classifier::load_bundle`]) is
/// called.
#[derive(Debug, Clone)]
pub struct Classifier {
    params: Option<Arc<ParameterSet>>,
    attack_budget: f32,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// An unparameterized classifier with the default attack budget.
    pub fn new() -> Self {
        Self {
            params: None,
            attack_budget: DEFAULT_ATTACK_BUDGET,
        }
    }

    pub fn with_config(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            params: None,
            attack_budget: config.attack_budget,
        })
    }

    /// A ready classifier with the default attack budget.
    pub fn from_parameters(params: ParameterSet) -> Self {
        let mut c = Self::new();
        c.load_parameters(params);
        c
    }

    /// Installs a new parameter set, replacing any previous one as a whole.
    ///
    /// Dimension chaining was validated when `params` was built.
    pub fn load_parameters(&mut self, params: ParameterSet) {
        tracing::debug!(
            dims = ?params.layers().iter().map(|l| (l.in_dim(), l.out_dim())).collect::<Vec<_>>(),
            "loaded classifier parameters"
        );
        self.params = Some(Arc::new(params));
    }

    /// Validates a named bundle and installs it.
    ///
    /// On error the previous parameters (if any) stay in place.
    pub fn load_bundle(&mut self, bundle: HashMap<String, Tensor>) -> Result<()> {
        let params = ParameterSet::from_bundle(bundle)?;
        self.load_parameters(params);
        Ok(())
    }

    /// Sets the L∞ bound used by [`Classifier::attack`].
    pub fn set_attack_budget(&mut self, eps: f32) -> Result<()> {
        check_budget(eps)?;
        tracing::debug!(eps, "set attack budget");
        self.attack_budget = eps;
        Ok(())
    }

    #[inline]
    pub fn attack_budget(&self) -> f32 {
        self.attack_budget
    }

    #[inline]
    pub fn config(&self) -> ClassifierConfig {
        ClassifierConfig {
            attack_budget: self.attack_budget,
        }
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.params.is_some()
    }

    /// A shared handle to the current parameters.
    #[inline]
    pub fn parameters(&self) -> Option<Arc<ParameterSet>> {
        self.params.clone()
    }

    #[inline]
    fn ready(&self) -> Result<&ParameterSet> {
        self.params.as_deref().ok_or(Error::NotReady)
    }

    /// Forward pass for a single sample.
    ///
    /// Fails with [`Error::Shape`] if `x.len()` is not the first layer's input
    /// dimension, and with [`Error::Numeric`] if `x` holds a non-finite value or
    /// the output scores cannot be turned into probabilities.
    pub fn forward(&self, x: &[f32]) -> Result<ForwardState> {
        let params = self.ready()?;
        check_input(params, x)?;

        let layers = params.layers();
        let mut pre_activations: [Vec<f32>; NUM_HIDDEN] =
            std::array::from_fn(|k| vec![0.0; layers[k].out_dim()]);
        let mut activations: [Vec<f32>; NUM_HIDDEN] =
            std::array::from_fn(|k| vec![0.0; layers[k].out_dim()]);

        for (k, layer) in layers[..NUM_HIDDEN].iter().enumerate() {
            let input: &[f32] = if k == 0 { x } else { &activations[k - 1] };
            layer.forward(input, &mut pre_activations[k]);
            relu_into(&pre_activations[k], &mut activations[k]);
        }

        let out_layer = &layers[NUM_HIDDEN];
        let mut logits = vec![0.0; out_layer.out_dim()];
        out_layer.forward(&activations[NUM_HIDDEN - 1], &mut logits);

        let mut probs = vec![0.0; logits.len()];
        softmax_into(&logits, &mut probs)?;
        let label = argmax(&probs)
            .ok_or_else(|| Error::Numeric("probabilities have no maximum".to_owned()))?;

        Ok(ForwardState {
            pre_activations,
            activations,
            logits,
            probs,
            label,
        })
    }

    /// Most likely class for `x`; ties go to the lowest index.
    pub fn predict(&self, x: &[f32]) -> Result<usize> {
        Ok(self.forward(x)?.predicted_label())
    }

    /// Cross-entropy loss of the prediction for `x` against class `y`.
    pub fn loss(&self, x: &[f32], y: usize) -> Result<f32> {
        let state = self.forward(x)?;
        cross_entropy(y, state.probs())
    }

    /// Gradient of the cross-entropy loss at `(x, y)` w.r.t the input `x`.
    pub fn gradient(&self, x: &[f32], y: usize) -> Result<Vec<f32>> {
        let state = self.forward(x)?;
        self.gradient_with_state(&state, y)
    }

    /// Input gradient from a previous [`Classifier::forward`] on the same input.
    ///
    /// Backpropagates `p - one_hot(y)` through the transposed weights, masking with
    /// `[z_k > 0]` from `state`. Nothing is recomputed.
    pub fn gradient_with_state(&self, state: &ForwardState, y: usize) -> Result<Vec<f32>> {
        let params = self.ready()?;
        check_state(params, state)?;

        let layers = params.layers();
        let mut d_z = vec![0.0; params.output_dim()];
        softmax_cross_entropy_backward(&state.probs, y, &mut d_z)?;

        for k in (0..NUM_HIDDEN).rev() {
            let mut d_h = vec![0.0; layers[k].out_dim()];
            layers[k + 1].backward_input(&d_z, &mut d_h);
            relu_mask_into(&state.pre_activations[k], &mut d_h);
            d_z = d_h;
        }

        let mut d_x = vec![0.0; params.input_dim()];
        layers[0].backward_input(&d_z, &mut d_x);
        Ok(d_x)
    }

    /// Single-step FGSM: `x + eps * sign(gradient(x, y))`.
    ///
    /// Uses the current attack budget. The result is not clipped to any input range.
    pub fn attack(&self, x: &[f32], y: usize) -> Result<Vec<f32>> {
        let grad = self.gradient(x, y)?;
        fgsm_perturb(x, &grad, self.attack_budget)
    }
}

/// Moves every coordinate of `x` by `eps` in the direction of `sign(grad)`.
///
/// Coordinates with a zero gradient are left unchanged.
pub fn fgsm_perturb(x: &[f32], grad: &[f32], eps: f32) -> Result<Vec<f32>> {
    check_budget(eps)?;
    if x.len() != grad.len() {
        return Err(Error::Shape(format!(
            "input len {} does not match gradient len {}",
            x.len(),
            grad.len()
        )));
    }

    Ok(x.iter()
        .zip(grad)
        .map(|(&xi, &g)| xi + eps * sign(g))
        .collect())
}

#[inline]
fn check_budget(eps: f32) -> Result<()> {
    if !(eps.is_finite() && eps >= 0.0) {
        return Err(Error::InvalidArgument(format!(
            "attack budget must be finite and >= 0, got {eps}"
        )));
    }
    Ok(())
}

#[inline]
fn check_input(params: &ParameterSet, x: &[f32]) -> Result<()> {
    if x.len() != params.input_dim() {
        return Err(Error::Shape(format!(
            "input len {} does not match model input_dim {}",
            x.len(),
            params.input_dim()
        )));
    }
    if let Some(i) = x.iter().position(|v| !v.is_finite()) {
        return Err(Error::Numeric(format!(
            "input value {} at index {i} is not finite",
            x[i]
        )));
    }
    Ok(())
}

fn check_state(params: &ParameterSet, state: &ForwardState) -> Result<()> {
    for (k, layer) in params.layers()[..NUM_HIDDEN].iter().enumerate() {
        if state.pre_activations[k].len() != layer.out_dim() {
            return Err(Error::Shape(format!(
                "forward state layer {k} has len {}, model layer out_dim is {}",
                state.pre_activations[k].len(),
                layer.out_dim()
            )));
        }
    }
    if state.probs.len() != params.output_dim() {
        return Err(Error::Shape(format!(
            "forward state has {} probabilities, model has {} classes",
            state.probs.len(),
            params.output_dim()
        )));
    }
    Ok(())
}
