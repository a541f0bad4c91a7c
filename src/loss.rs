//! Cross-entropy loss over softmax probabilities.
//!
//! The classifier ends in a softmax, so these helpers take probabilities (not logits)
//! and an integer class label:
//!
//! - `cross_entropy(y, p) = -ln(p[y])`
//! - `d(loss)/d(logits) = p - one_hot(y)`

use crate::{Error, Result};

#[inline]
fn check_label(label: usize, num_classes: usize) -> Result<()> {
    if label >= num_classes {
        return Err(Error::InvalidArgument(format!(
            "label {label} is out of range for {num_classes} classes"
        )));
    }
    Ok(())
}

/// Cross-entropy of a probability vector against the true class `label`.
///
/// Returns `-ln(probs[label])`. A zero or non-finite probability at `label` would
/// give an infinite or NaN loss, so it is reported as [`Error::Numeric`].
pub fn cross_entropy(label: usize, probs: &[f32]) -> Result<f32> {
    check_label(label, probs.len())?;

    let p = probs[label];
    if !(p.is_finite() && p > 0.0) {
        return Err(Error::Numeric(format!(
            "probability of true class {label} is {p}; loss would not be finite"
        )));
    }

    Ok(-p.ln())
}

/// Writes a one-hot encoding of `label` into `out`.
pub fn one_hot_into(label: usize, out: &mut [f32]) -> Result<()> {
    check_label(label, out.len())?;

    out.fill(0.0);
    out[label] = 1.0;
    Ok(())
}

/// Gradient of softmax cross-entropy w.r.t the logits.
///
/// Writes `d_logits = probs - one_hot(label)`. This is the joint derivative of
/// softmax followed by cross-entropy; no separate softmax Jacobian is applied.
///
/// Shape contract: `probs.len() == d_logits.len()`.
pub fn softmax_cross_entropy_backward(
    probs: &[f32],
    label: usize,
    d_logits: &mut [f32],
) -> Result<()> {
    if probs.len() != d_logits.len() {
        return Err(Error::Shape(format!(
            "probs len {} does not match d_logits len {}",
            probs.len(),
            d_logits.len()
        )));
    }

    one_hot_into(label, d_logits)?;
    for (d, &p) in d_logits.iter_mut().zip(probs) {
        *d = p - *d;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_entropy_matches_negative_log() {
        let p = [0.25_f32, 0.5, 0.25];
        let loss = cross_entropy(1, &p).unwrap();
        assert!((loss - std::f32::consts::LN_2).abs() < 1e-6);

        assert_eq!(cross_entropy(0, &[1.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn cross_entropy_prefers_correct_class() {
        let good = [0.9_f32, 0.05, 0.05];
        let bad = [0.05_f32, 0.05, 0.9];
        assert!(cross_entropy(0, &good).unwrap() < cross_entropy(0, &bad).unwrap());
    }

    #[test]
    fn cross_entropy_rejects_zero_probability() {
        let err = cross_entropy(1, &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, Error::Numeric(_)));

        let err = cross_entropy(0, &[f32::NAN, 0.5]).unwrap_err();
        assert!(matches!(err, Error::Numeric(_)));
    }

    #[test]
    fn cross_entropy_rejects_out_of_range_label() {
        let err = cross_entropy(3, &[0.5, 0.5]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn backward_is_probs_minus_one_hot() {
        let p = [0.2_f32, 0.7, 0.1];
        let mut d = [9.0_f32; 3];
        softmax_cross_entropy_backward(&p, 1, &mut d).unwrap();
        assert!((d[0] - 0.2).abs() < 1e-6);
        assert!((d[1] - (-0.3)).abs() < 1e-6);
        assert!((d[2] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn one_hot_sets_a_single_entry() {
        let mut out = [7.0_f32; 4];
        one_hot_into(2, &mut out).unwrap();
        assert_eq!(out, [0.0, 0.0, 1.0, 0.0]);
        assert!(one_hot_into(4, &mut out).is_err());
    }
}
