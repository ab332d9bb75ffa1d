//! Outcome classifiers.
//!
//! A model is a sum type: a constant predictor (single outcome class in the
//! training data) or a logistic classifier trained by plain gradient
//! descent. `predict` is total; artifact loading degrades unrecognized
//! shapes to a constant-1 predictor with a warning, per the pipeline's
//! failure semantics.

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Model {
    /// Every training row had this outcome class.
    Constant { class: u8 },
    /// Learned binary classifier over covariates + treatment value.
    Logistic {
        feature_names: Vec<String>,
        weights: Vec<f64>,
        bias: f64,
    },
}

impl Model {
    /// Binary prediction; `None` when the feature vector does not match the
    /// trained arity (the caller decides how to degrade).
    pub fn try_predict(&self, features: &[f64]) -> Option<u8> {
        match self {
            Model::Constant { class } => Some(*class),
            Model::Logistic { weights, bias, .. } => {
                if features.len() != weights.len() {
                    return None;
                }
                let z: f64 = bias
                    + weights
                        .iter()
                        .zip(features)
                        .map(|(w, x)| w * x)
                        .sum::<f64>();
                Some(u8::from(sigmoid(z) >= 0.5))
            }
        }
    }

    /// Train on covariates-plus-treatment feature rows. A single outcome
    /// class short-circuits to a constant predictor.
    pub fn train(
        features: &[Vec<f64>],
        outcomes: &[u8],
        feature_names: Vec<String>,
        config: &PipelineConfig,
    ) -> Model {
        if let Some(&first) = outcomes.first() {
            if outcomes.iter().all(|&o| o == first) {
                return Model::Constant { class: first };
            }
        } else {
            return Model::Constant { class: 1 };
        }

        let width = feature_names.len();
        let mut weights = vec![0.0; width];
        let mut bias = 0.0;
        let n = features.len() as f64;
        for _ in 0..config.training_epochs {
            let mut grad_w = vec![0.0; width];
            let mut grad_b = 0.0;
            for (row, &outcome) in features.iter().zip(outcomes) {
                let z: f64 = bias + weights.iter().zip(row).map(|(w, x)| w * x).sum::<f64>();
                let error = sigmoid(z) - f64::from(outcome);
                for (g, x) in grad_w.iter_mut().zip(row) {
                    *g += error * x;
                }
                grad_b += error;
            }
            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= config.learning_rate * g / n;
            }
            bias -= config.learning_rate * grad_b / n;
        }

        Model::Logistic {
            feature_names,
            weights,
            bias,
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Per-variable model artifacts on disk, one JSON file each.
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ModelStore { dir: dir.into() }
    }

    /// Artifact path for a treatment variable, filesystem-safe.
    pub fn path_for(&self, treatment_var: &str) -> PathBuf {
        let safe: String = treatment_var
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '-' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    pub fn save(&self, treatment_var: &str, model: &Model) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let path = self.path_for(treatment_var);
        let json = serde_json::to_string_pretty(model).map_err(|e| Error::Model(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| Error::io(path, e))
    }

    /// Load a variable's model. A missing artifact is an error the caller
    /// skips on; an unreadable shape collapses to constant-1.
    pub fn load(&self, treatment_var: &str) -> Result<Model> {
        let path = self.path_for(treatment_var);
        let content = std::fs::read_to_string(&path)
            .map_err(|_| Error::Model(format!("no model artifact for {treatment_var}")))?;
        match serde_json::from_str(&content) {
            Ok(model) => Ok(model),
            Err(err) => {
                warn!(%treatment_var, %err, "unrecognized model artifact; using constant-1");
                Ok(Model::Constant { class: 1 })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn test_single_class_trains_constant() {
        let features = vec![vec![1.0], vec![2.0], vec![3.0]];
        let model = Model::train(&features, &[1, 1, 1], vec!["t".into()], &config());
        assert_eq!(model, Model::Constant { class: 1 });
        assert_eq!(model.try_predict(&[99.0]), Some(1));
    }

    #[test]
    fn test_separable_data_learns_threshold() {
        // Outcome perfectly separated by the single feature.
        let features = vec![vec![0.0], vec![0.0], vec![1.0], vec![1.0]];
        let outcomes = [0, 0, 1, 1];
        let model = Model::train(&features, &outcomes, vec!["t".into()], &config());
        assert_eq!(model.try_predict(&[0.0]), Some(0));
        assert_eq!(model.try_predict(&[1.0]), Some(1));
    }

    #[test]
    fn test_arity_mismatch_yields_none() {
        let model = Model::Logistic {
            feature_names: vec!["a".into(), "t".into()],
            weights: vec![0.5, 0.5],
            bias: 0.0,
        };
        assert_eq!(model.try_predict(&[1.0]), None);
        assert!(model.try_predict(&[1.0, 1.0]).is_some());
    }

    #[test]
    fn test_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let model = Model::Logistic {
            feature_names: vec!["a".into()],
            weights: vec![1.25],
            bias: -0.5,
        };
        store.save("result_4", &model).unwrap();
        assert_eq!(store.load("result_4").unwrap(), model);
    }

    #[test]
    fn test_missing_artifact_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        assert!(matches!(store.load("ghost_1"), Err(Error::Model(_))));
    }

    #[test]
    fn test_unrecognized_artifact_degrades_to_constant_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(store.path_for("odd_1"), "{\"kind\":\"forest\"}").unwrap();
        assert_eq!(store.load("odd_1").unwrap(), Model::Constant { class: 1 });
    }
}
