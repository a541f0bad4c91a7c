//! Parameter bundle serialization (feature: `serde`).
//!
//! A bundle on disk is a versioned JSON object mapping names (`"fc1.weight"`,
//! `"fc1.bias"`, ...) to tensors:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "tensors": {
//!     "fc1.weight": { "shape": [784, 128], "data": [0.01, ...] },
//!     "fc1.bias": { "shape": [128], "data": [0.0, ...] }
//!   }
//! }
//! ```
//!
//! Design notes:
//! - Loading goes through [`ParameterSet::from_bundle`], so shape chaining and
//!   finiteness are validated exactly as for in-memory bundles.
//! - Tensors are kept in a `BTreeMap` so saved files have a stable key order.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::params::Tensor;
use crate::{Classifier, Error, ParameterSet, Result};

pub const BUNDLE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedBundle {
    pub format_version: u32,
    pub tensors: BTreeMap<String, SerializedTensor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedTensor {
    pub shape: Vec<usize>,
    /// Row-major.
    pub data: Vec<f32>,
}

impl From<&ParameterSet> for SerializedBundle {
    fn from(params: &ParameterSet) -> Self {
        let tensors = params
            .to_bundle()
            .into_iter()
            .map(|(name, t)| {
                let tensor = SerializedTensor {
                    shape: t.shape().to_vec(),
                    data: t.into_data(),
                };
                (name, tensor)
            })
            .collect();
        Self {
            format_version: BUNDLE_FORMAT_VERSION,
            tensors,
        }
    }
}

impl TryFrom<SerializedBundle> for ParameterSet {
    type Error = Error;

    fn try_from(value: SerializedBundle) -> std::result::Result<Self, Self::Error> {
        if value.format_version != BUNDLE_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported bundle format_version {}; expected {}",
                value.format_version, BUNDLE_FORMAT_VERSION
            )));
        }

        let bundle = value
            .tensors
            .into_iter()
            .map(|(name, t)| {
                let tensor = Tensor::new(t.shape, t.data)
                    .map_err(|e| Error::InvalidData(format!("tensor {name:?}: {e}")))?;
                Ok((name, tensor))
            })
            .collect::<Result<_>>()?;

        ParameterSet::from_bundle(bundle)
    }
}

impl ParameterSet {
    /// Serialize the parameters to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&SerializedBundle::from(self))
            .map_err(|e| Error::InvalidData(format!("failed to serialize parameters: {e}")))
    }

    /// Parse parameters from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedBundle = serde_json::from_str(s)
            .map_err(|e| Error::InvalidData(format!("failed to parse parameter json: {e}")))?;
        ser.try_into()
    }

    /// Save the parameters to a JSON file (pretty-printed).
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string_pretty()?;
        let p = path.as_ref();
        std::fs::write(p, s)
            .map_err(|e| Error::InvalidData(format!("failed to write {}: {e}", p.display())))?;
        Ok(())
    }

    /// Load parameters from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p)
            .map_err(|e| Error::InvalidData(format!("failed to read {}: {e}", p.display())))?;
        tracing::debug!(path = %p.display(), "loading parameter bundle");
        Self::from_json_str(&s)
    }
}

impl Classifier {
    /// Load a JSON bundle from disk and install it.
    ///
    /// On error the previous parameters (if any) stay in place.
    pub fn load_json<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let params = ParameterSet::load_json(path)?;
        self.load_parameters(params);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_json(version: u32, fc4_bias: &str) -> String {
        let identity = r#"{"shape":[2,2],"data":[1.0,0.0,0.0,1.0]}"#;
        let zeros = r#"{"shape":[2],"data":[0.0,0.0]}"#;
        format!(
            r#"{{"format_version":{version},"tensors":{{
                "fc1.weight":{identity},"fc1.bias":{zeros},
                "fc2.weight":{identity},"fc2.bias":{zeros},
                "fc3.weight":{identity},"fc3.bias":{zeros},
                "fc4.weight":{identity},"fc4.bias":{fc4_bias}
            }}}}"#
        )
    }

    #[test]
    fn parses_hand_written_bundle() {
        let json = tiny_json(1, r#"{"shape":[2],"data":[0.5,-0.5]}"#);
        let params = ParameterSet::from_json_str(&json).unwrap();
        assert_eq!(params.input_dim(), 2);
        assert_eq!(params.layer(3).unwrap().biases(), &[0.5_f32, -0.5]);
    }

    #[test]
    fn json_roundtrip_preserves_parameters() {
        let params = ParameterSet::new_with_seed([3, 4, 4, 4, 2], 8).unwrap();
        let json = params.to_json_string_pretty().unwrap();
        assert_eq!(ParameterSet::from_json_str(&json).unwrap(), params);

        // Keys are written in sorted order.
        let fc1_bias = json.find("\"fc1.bias\"").unwrap();
        let fc1_weight = json.find("\"fc1.weight\"").unwrap();
        let fc2_bias = json.find("\"fc2.bias\"").unwrap();
        assert!(fc1_bias < fc1_weight && fc1_weight < fc2_bias);
    }

    #[test]
    fn rejects_unknown_version() {
        let err = ParameterSet::from_json_str(&tiny_json(999, r#"{"shape":[2],"data":[0,0]}"#))
            .unwrap_err();
        assert!(format!("{err}").contains("format_version"));
    }

    #[test]
    fn rejects_tensor_with_wrong_data_length() {
        let err = ParameterSet::from_json_str(&tiny_json(1, r#"{"shape":[2],"data":[0.0]}"#))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(ref m) if m.contains("fc4.bias")));
    }

    #[test]
    fn classifier_config_is_serializable() {
        let cfg: crate::ClassifierConfig =
            serde_json::from_str(r#"{"attack_budget":0.3}"#).unwrap();
        assert_eq!(cfg.attack_budget, 0.3);
    }
}
