//! Versioned JSON model files.
//!
//! A model document carries the architecture descriptor, one weight matrix and
//! bias vector per dense layer, and optional training metadata:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "trained_at": "2026-01-01T00:00:00Z",
//!   "training": { "samples": 412, "epochs": 10000, ... },
//!   "architecture": { "layer_sizes": [5, 30, 1], "activations": ["tanh", "tanh"] },
//!   "layers": [ { "weights": [[...], ...], "biases": [...] }, ... ]
//! }
//! ```
//!
//! Floats are written in their shortest round-trip form and parsed back
//! exactly, so a loaded network decides bit-identically to the saved one.

use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    network::{Architecture, ArchitectureError, DenseLayer, PolicyNetwork},
    trainer::TrainingReport,
};

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerWeights {
    /// One row per output unit.
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyModel {
    pub format_version: u32,
    pub trained_at: Option<DateTime<Utc>>,
    pub training: Option<TrainingReport>,
    pub architecture: Architecture,
    pub layers: Vec<LayerWeights>,
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum LoadError {
    #[display("failed to open model file {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to parse model file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("unsupported model format version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[display("incompatible model: {_0}")]
    Incompatible(ArchitectureError),
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum SaveError {
    #[display("failed to write model file {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to serialize model for {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl PolicyModel {
    #[must_use]
    pub fn from_network(network: &PolicyNetwork) -> Self {
        let layers = network
            .layers()
            .iter()
            .map(|layer| LayerWeights {
                weights: layer.rows().map(<[f64]>::to_vec).collect(),
                biases: layer.biases().to_vec(),
            })
            .collect();
        Self {
            format_version: MODEL_FORMAT_VERSION,
            trained_at: None,
            training: None,
            architecture: network.architecture(),
            layers,
        }
    }

    #[must_use]
    pub fn with_training(mut self, report: TrainingReport, trained_at: DateTime<Utc>) -> Self {
        self.training = Some(report);
        self.trained_at = Some(trained_at);
        self
    }

    /// Rebuilds the network, checking every matrix against the descriptor.
    pub fn to_network(&self) -> Result<PolicyNetwork, LoadError> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(LoadError::UnsupportedVersion {
                found: self.format_version,
                expected: MODEL_FORMAT_VERSION,
            });
        }
        let architecture = &self.architecture;
        architecture.validate().map_err(LoadError::Incompatible)?;

        let expected = architecture.activations.len();
        if self.layers.len() != expected {
            return Err(LoadError::Incompatible(ArchitectureError::LayerCount {
                expected,
                found: self.layers.len(),
            }));
        }

        let layers = self
            .layers
            .iter()
            .zip(architecture.layer_sizes.windows(2))
            .zip(&architecture.activations)
            .enumerate()
            .map(|(index, ((layer, sizes), activation))| {
                let (inputs, outputs) = (sizes[0], sizes[1]);
                if layer.biases.len() != outputs {
                    return Err(ArchitectureError::BiasCount {
                        layer: index,
                        expected: outputs,
                        found: layer.biases.len(),
                    });
                }
                DenseLayer::from_rows(
                    index,
                    inputs,
                    *activation,
                    &layer.weights,
                    layer.biases.clone(),
                )
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(LoadError::Incompatible)?;

        PolicyNetwork::from_layers(layers).map_err(LoadError::Incompatible)
    }

    pub fn open<P>(path: P) -> Result<Self, LoadError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|source| LoadError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Writes the document next to `path` and renames it into place.
    pub fn save<P>(&self, path: P) -> Result<(), SaveError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let io_error = |source| SaveError::Io {
            path: path.to_owned(),
            source,
        };

        let mut tmp_name = path.file_name().map(OsString::from).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        let file = File::create(&tmp_path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|source| SaveError::Serialize {
            path: path.to_owned(),
            source,
        })?;
        writeln!(writer).map_err(io_error)?;
        writer.flush().map_err(io_error)?;
        drop(writer);
        fs::rename(&tmp_path, path).map_err(io_error)?;
        Ok(())
    }
}

impl PolicyNetwork {
    /// Loads a network from a model file.
    pub fn load<P>(path: P) -> Result<Self, LoadError>
    where
        P: AsRef<Path>,
    {
        PolicyModel::open(path)?.to_network()
    }

    pub fn save<P>(&self, path: P) -> Result<(), SaveError>
    where
        P: AsRef<Path>,
    {
        PolicyModel::from_network(self).save(path)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::{Rng as _, SeedableRng as _};
    use rand_pcg::Pcg32;
    use tempfile::TempDir;

    use super::*;
    use crate::{network::Activation, trainer::StopReason};

    fn network(seed: u64) -> PolicyNetwork {
        PolicyNetwork::cavern_pilot(&mut Pcg32::seed_from_u64(seed))
    }

    #[test]
    fn test_save_then_load_decides_identically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("policy.json");
        let original = network(17);
        original.save(&path).unwrap();

        let loaded = PolicyNetwork::load(&path).unwrap();
        assert_eq!(loaded, original);

        let mut rng = Pcg32::seed_from_u64(99);
        for _ in 0..200 {
            let input: [f64; 5] = rng.random();
            assert_eq!(
                loaded.forward(&input).unwrap(),
                original.forward(&input).unwrap()
            );
            assert_eq!(
                loaded.decide(&input).unwrap(),
                original.decide(&input).unwrap()
            );
        }
        assert!(!dir.path().join("policy.json.tmp").exists());
    }

    #[test]
    fn test_training_metadata_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("policy.json");
        let report = TrainingReport {
            samples: 12,
            epochs: 40,
            final_error: 0.125,
            stop_reason: StopReason::MaxEpochs,
            elapsed: Duration::from_millis(15),
        };
        let trained_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let model = PolicyModel::from_network(&network(1)).with_training(report, trained_at);
        model.save(&path).unwrap();

        let loaded = PolicyModel::open(&path).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = PolicyNetwork::load(dir.path().join("missing.json")).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.json");
        fs::write(&path, "{ \"format_version\": 1, \"layers\": [").unwrap();
        let err = PolicyNetwork::load(&path).unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_wrong_version_is_rejected() {
        let mut model = PolicyModel::from_network(&network(1));
        model.format_version = 99;
        let err = model.to_network().unwrap_err();
        assert!(matches!(
            err,
            LoadError::UnsupportedVersion {
                found: 99,
                expected: 1
            }
        ));
    }

    #[test]
    fn test_shape_mismatch_is_incompatible() {
        let mut model = PolicyModel::from_network(&network(1));
        model.layers[0].weights[3].pop();
        assert!(model.to_network().unwrap_err().is_incompatible());

        let mut model = PolicyModel::from_network(&network(1));
        model.layers[1].biases.push(0.0);
        assert!(model.to_network().unwrap_err().is_incompatible());

        let mut model = PolicyModel::from_network(&network(1));
        model.layers.pop();
        assert!(model.to_network().unwrap_err().is_incompatible());

        let mut model = PolicyModel::from_network(&network(1));
        model.architecture.activations = vec![Activation::Tanh];
        assert!(model.to_network().unwrap_err().is_incompatible());
    }

    #[test]
    fn test_descriptor_is_written() {
        let model = PolicyModel::from_network(&network(1));
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["format_version"], 1);
        assert_eq!(
            json["architecture"]["layer_sizes"],
            serde_json::json!([5, 30, 1])
        );
        assert_eq!(
            json["architecture"]["activations"],
            serde_json::json!(["tanh", "tanh"])
        );
        assert_eq!(json["layers"][0]["weights"].as_array().unwrap().len(), 30);
        assert_eq!(json["layers"][1]["weights"][0].as_array().unwrap().len(), 30);
    }
}
