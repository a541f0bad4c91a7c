//! Labeled samples.
//!
//! `Dataset` keeps every input row in one contiguous row-major buffer next to an
//! integer class label per row.

use crate::{Error, Result};

/// A classification dataset: inputs (X) and class labels (y).
///
/// Stored with row-major layout:
/// - `inputs.len() == len * input_dim`
/// - `labels.len() == len`
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    inputs: Vec<f32>,
    labels: Vec<usize>,
    input_dim: usize,
}

impl Dataset {
    /// Build a dataset from a flat `(len, input_dim)` input buffer and `len` labels.
    pub fn from_flat(inputs: Vec<f32>, labels: Vec<usize>, input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidData("input_dim must be > 0".to_owned()));
        }
        if !inputs.len().is_multiple_of(input_dim) {
            return Err(Error::InvalidData(format!(
                "inputs length {} is not divisible by input_dim {input_dim}",
                inputs.len()
            )));
        }

        let len = inputs.len() / input_dim;
        if labels.len() != len {
            return Err(Error::InvalidData(format!(
                "labels length {} does not match number of input rows {len}",
                labels.len()
            )));
        }

        Ok(Self {
            inputs,
            labels,
            input_dim,
        })
    }

    /// Build a dataset from per-sample rows.
    ///
    /// This is a convenience constructor (it copies into contiguous storage).
    pub fn from_rows(inputs: &[Vec<f32>], labels: &[usize]) -> Result<Self> {
        if inputs.len() != labels.len() {
            return Err(Error::InvalidData(format!(
                "inputs/labels length mismatch: {} vs {}",
                inputs.len(),
                labels.len()
            )));
        }
        if inputs.is_empty() {
            return Err(Error::InvalidData("inputs must not be empty".to_owned()));
        }

        let input_dim = inputs[0].len();
        if input_dim == 0 {
            return Err(Error::InvalidData("input_dim must be > 0".to_owned()));
        }

        let mut flat = Vec::with_capacity(inputs.len() * input_dim);
        for (i, row) in inputs.iter().enumerate() {
            if row.len() != input_dim {
                return Err(Error::InvalidData(format!(
                    "input row {i} has len {}, expected {input_dim}",
                    row.len()
                )));
            }
            flat.extend_from_slice(row);
        }

        Ok(Self {
            inputs: flat,
            labels: labels.to_vec(),
            input_dim,
        })
    }

    #[inline]
    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    /// Returns true if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    /// Returns the per-sample input dimension.
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    /// Returns the `idx`-th input row (shape: `(input_dim,)`).
    ///
    /// Panics if `idx >= len`.
    pub fn input(&self, idx: usize) -> &[f32] {
        let start = idx * self.input_dim;
        &self.inputs[start..start + self.input_dim]
    }

    #[inline]
    /// Returns the `idx`-th label.
    ///
    /// Panics if `idx >= len`.
    pub fn label(&self, idx: usize) -> usize {
        self.labels[idx]
    }

    /// Iterates `(input, label)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&[f32], usize)> + '_ {
        self.inputs
            .chunks_exact(self.input_dim)
            .zip(self.labels.iter().copied())
    }

    /// Checks that every label is below `num_classes`.
    pub fn validate_labels(&self, num_classes: usize) -> Result<()> {
        if let Some((i, &y)) = self
            .labels
            .iter()
            .enumerate()
            .find(|&(_, &y)| y >= num_classes)
        {
            return Err(Error::InvalidData(format!(
                "label {y} of sample {i} is out of range for {num_classes} classes"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_flat_validates_shapes() {
        let ok = Dataset::from_flat(vec![0.0, 1.0, 2.0, 3.0], vec![0, 1], 2);
        assert!(ok.is_ok());

        let err = Dataset::from_flat(vec![0.0, 1.0, 2.0], vec![0], 2);
        assert!(err.is_err());

        let err = Dataset::from_flat(vec![0.0, 1.0, 2.0, 3.0], vec![0], 2);
        assert!(err.is_err());
    }

    #[test]
    fn rows_and_labels_line_up() {
        let data = Dataset::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]], &[7, 3]).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.input(1), &[3.0_f32, 4.0]);
        assert_eq!(data.label(0), 7);

        let pairs: Vec<_> = data.iter().collect();
        assert_eq!(pairs, vec![(&[1.0_f32, 2.0][..], 7), (&[3.0_f32, 4.0][..], 3)]);
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let err = Dataset::from_rows(&[vec![1.0, 2.0], vec![3.0]], &[0, 1]);
        assert!(err.is_err());
    }

    #[test]
    fn validate_labels_reports_first_bad_label() {
        let data = Dataset::from_flat(vec![0.0; 6], vec![0, 5, 9], 2).unwrap();
        assert!(data.validate_labels(10).is_ok());
        let err = data.validate_labels(6).unwrap_err();
        assert!(format!("{err}").contains("label 9 of sample 2"));
    }
}
