//! Activation primitives.
//!
//! Each hidden layer computes a pre-activation `z = x·W + b` and then applies ReLU
//! element-wise: `h = relu(z)`. The output layer feeds its scores into `softmax`.
//!
//! Unlike a training crate we cache the *pre-activation* `z` for every hidden layer
//! (see [`crate::ForwardState`]). The input-gradient backward pass masks with
//! `z > 0`, so the subgradient at exactly `0` is `0`.

use crate::{Error, Result};

/// Element-wise `max(x, 0)`.
#[inline]
pub fn relu(x: &[f32]) -> Vec<f32> {
    let mut out = vec![0.0; x.len()];
    relu_into(x, &mut out);
    out
}

/// Element-wise `max(z, 0)` written into `out`.
///
/// NaN is passed through unchanged.
///
/// Shape contract: `z.len() == out.len()`.
#[inline]
pub fn relu_into(z: &[f32], out: &mut [f32]) {
    debug_assert_eq!(z.len(), out.len());

    for (o, &v) in out.iter_mut().zip(z) {
        *o = if v < 0.0 { 0.0 } else { v };
    }
}

/// Multiplies an upstream gradient by the ReLU derivative `[z > 0]`, in place.
///
/// A NaN pre-activation is treated as inactive.
///
/// Shape contract: `z.len() == grad.len()`.
#[inline]
pub fn relu_mask_into(z: &[f32], grad: &mut [f32]) {
    debug_assert_eq!(z.len(), grad.len());

    for (g, &v) in grad.iter_mut().zip(z) {
        if v.is_nan() || v <= 0.0 {
            *g = 0.0;
        }
    }
}

/// Numerically stable softmax.
pub fn softmax(x: &[f32]) -> Result<Vec<f32>> {
    let mut out = vec![0.0; x.len()];
    softmax_into(x, &mut out)?;
    Ok(out)
}

/// Numerically stable softmax written into `out`.
///
/// The max element is subtracted before exponentiating, so every exponent is `<= 0`
/// and the normalizer is at least `1`. Fails with [`Error::Numeric`] if the input
/// has no finite maximum (all-NaN, `+inf`, all `-inf`) or if any output is not
/// finite.
pub fn softmax_into(x: &[f32], out: &mut [f32]) -> Result<()> {
    if x.is_empty() {
        return Err(Error::Shape("softmax requires at least 1 element".to_owned()));
    }
    if x.len() != out.len() {
        return Err(Error::Shape(format!(
            "softmax input len {} does not match output len {}",
            x.len(),
            out.len()
        )));
    }

    let max_x = x.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max_x.is_finite() {
        return Err(Error::Numeric(format!(
            "softmax input has no finite maximum (max = {max_x})"
        )));
    }

    let mut sum_exp = 0.0_f32;
    for (o, &v) in out.iter_mut().zip(x) {
        *o = (v - max_x).exp();
        sum_exp += *o;
    }
    if !(sum_exp.is_finite() && sum_exp > 0.0) {
        return Err(Error::Numeric(format!(
            "softmax normalizer is not finite and positive: {sum_exp}"
        )));
    }

    let inv_sum = 1.0 / sum_exp;
    for o in out.iter_mut() {
        *o *= inv_sum;
    }

    if out.iter().any(|v| !v.is_finite()) {
        return Err(Error::Numeric(
            "softmax produced a non-finite probability".to_owned(),
        ));
    }

    Ok(())
}

/// Index of the largest element; ties go to the lowest index.
///
/// NaN entries never win. Returns `None` for an empty slice or an all-NaN slice.
#[inline]
pub fn argmax(xs: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in xs.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Sign with an exact zero: `-1`, `0` or `+1`.
///
/// `f32::signum` maps `+0.0` to `1.0`, which would move a coordinate whose
/// gradient vanishes.
#[inline]
pub fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_sums_to_one(p: &[f32]) {
        let sum: f32 = p.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "sum = {sum}");
        assert!(p.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn relu_clamps_negatives() {
        assert_eq!(relu(&[-2.0, 0.0, 3.0]), vec![0.0, 0.0, 3.0]);
    }

    #[test]
    fn relu_propagates_nan() {
        let h = relu(&[f32::NAN, -1.0, 2.0]);
        assert!(h[0].is_nan());
        assert_eq!(&h[1..], &[0.0, 2.0]);
    }

    #[test]
    fn relu_mask_zeroes_non_positive_pre_activations() {
        let z = [-1.0_f32, 0.0, 2.0, f32::NAN];
        let mut g = [5.0_f32, 5.0, 5.0, 5.0];
        relu_mask_into(&z, &mut g);
        assert_eq!(g, [0.0, 0.0, 5.0, 0.0]);
    }

    #[test]
    fn softmax_basic_values() {
        let p = softmax(&[0.0, 0.0]).unwrap();
        assert!((p[0] - 0.5).abs() < 1e-6);
        assert!((p[1] - 0.5).abs() < 1e-6);

        let p = softmax(&[1.0, 2.0, 3.0]).unwrap();
        assert_sums_to_one(&p);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn softmax_is_stable_for_large_inputs() {
        let p = softmax(&[1000.0, 1001.0, -1000.0]).unwrap();
        assert_sums_to_one(&p);
        assert!(p[2] < 1e-6);

        let p = softmax(&[-1e30, 0.0]).unwrap();
        assert_sums_to_one(&p);
    }

    #[test]
    fn softmax_is_shift_invariant() {
        let x = [0.3_f32, -1.2, 2.5, 0.0];
        let base = softmax(&x).unwrap();
        for c in [-50.0_f32, -1.0, 3.5, 80.0] {
            let shifted: Vec<f32> = x.iter().map(|v| v + c).collect();
            let p = softmax(&shifted).unwrap();
            for (a, b) in base.iter().zip(&p) {
                assert!((a - b).abs() < 1e-6, "c={c} a={a} b={b}");
            }
        }
    }

    #[test]
    fn softmax_tolerates_negative_infinity_entries() {
        let p = softmax(&[f32::NEG_INFINITY, 0.0]).unwrap();
        assert_eq!(p, vec![0.0, 1.0]);
    }

    #[test]
    fn softmax_rejects_non_finite_input() {
        assert!(matches!(
            softmax(&[f32::NAN, f32::NAN]),
            Err(Error::Numeric(_))
        ));
        assert!(matches!(
            softmax(&[f32::INFINITY, 0.0]),
            Err(Error::Numeric(_))
        ));
        assert!(matches!(
            softmax(&[f32::NEG_INFINITY, f32::NEG_INFINITY]),
            Err(Error::Numeric(_))
        ));
        assert!(matches!(softmax(&[f32::NAN, 1.0]), Err(Error::Numeric(_))));
        assert!(matches!(softmax(&[]), Err(Error::Shape(_))));
    }

    #[test]
    fn argmax_breaks_ties_by_first_index() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[f32::NAN, 0.2, 0.1]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn sign_is_zero_at_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.0), 0.0);
        assert_eq!(sign(3.0), 1.0);
        assert_eq!(sign(-1e-20), -1.0);
    }
}
