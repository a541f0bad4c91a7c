//! Frozen MLP classifier with FGSM adversarial examples.
//!
//! `rust-fgsm` evaluates a pre-trained 4-layer fully-connected classifier and crafts
//! adversarial inputs for it with the Fast Gradient Sign Method. The weights are never
//! updated: backpropagation here produces the gradient of the loss w.r.t the *input*.
//!
//! # Model
//!
//! ```text
//! x -> [fc1, relu] -> [fc2, relu] -> [fc3, relu] -> [fc4, softmax] -> p
//! ```
//!
//! - Scalars are `f32`.
//! - Layer weights are row-major with shape `(in_dim, out_dim)`; a layer computes
//!   `z = x·W + b`.
//! - Parameters arrive as a named bundle (`"fc1.weight"`, `"fc1.bias"`, ...
//!   `"fc4.bias"`), see [`ParameterSet::from_bundle`].
//!
//! # Forward state instead of hidden caches
//!
//! [`Classifier::forward`] returns a [`ForwardState`] holding `z1, h1, z2, h2, z3, h3`,
//! the logits and the probabilities. [`Classifier::gradient_with_state`] consumes it.
//! The classifier keeps no per-call state, so one instance can be shared across
//! threads and the sample loop parallelized freely.
//!
//! # Errors
//!
//! Every evaluation returns [`Result`]. Shape mismatches, evaluating before
//! parameters are loaded, a negative attack budget and non-finite inputs or
//! softmax/loss values each have their own [`Error`] variant.
//!
//! # Quick start
//!
//! ```rust
//! use rust_fgsm::{Classifier, ParameterSet};
//!
//! # fn main() -> rust_fgsm::Result<()> {
//! let params = ParameterSet::new_with_seed([4, 8, 8, 8, 3], 0)?;
//! let mut clf = Classifier::from_parameters(params);
//! clf.set_attack_budget(0.05)?;
//!
//! let x = [0.1_f32, 0.4, -0.2, 0.9];
//! let label = clf.predict(&x)?;
//!
//! let x_adv = clf.attack(&x, label)?;
//! assert!(x.iter().zip(&x_adv).all(|(a, b)| (a - b).abs() <= 0.05 + 1e-6));
//! let _adv_label = clf.predict(&x_adv)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Evaluating a dataset
//!
//! ```rust
//! use rust_fgsm::{Classifier, Dataset, EvalConfig, ParameterSet};
//!
//! # fn main() -> rust_fgsm::Result<()> {
//! let clf = Classifier::from_parameters(ParameterSet::new_with_seed([2, 4, 4, 4, 2], 1)?);
//! let data = Dataset::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]], &[0, 1])?;
//!
//! let report = clf.evaluate(&data, EvalConfig::default())?;
//! println!(
//!     "clean={} adversarial={:?}",
//!     report.clean_accuracy(),
//!     report.adversarial_accuracy()
//! );
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod classifier;
pub mod data;
pub mod error;
pub mod eval;
pub mod layer;
pub mod loss;
pub(crate) mod matmul;
pub mod params;

#[cfg(feature = "serde")]
pub mod bundle;

pub use classifier::{
    Classifier, ClassifierConfig, DEFAULT_ATTACK_BUDGET, ForwardState, fgsm_perturb,
};
pub use data::Dataset;
pub use error::{Error, Result};
pub use eval::{EvalConfig, EvalReport};
pub use layer::Layer;
pub use params::{NUM_LAYERS, ParameterSet, Tensor};
