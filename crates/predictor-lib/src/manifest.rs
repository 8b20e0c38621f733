//! Startup assembly of predictors from a JSON manifest
//!
//! A manifest lists the predictors to serve, each with its model variant,
//! schemas and self-test fixtures. Schemas may be omitted, in which case the
//! variant's own schemas are used. Every predictor must construct
//! successfully or assembly fails as a whole.

use crate::error::{ConstructionError, RegistryError};
use crate::predictor::{Contract, LogisticRegression, Predictor, DEFAULT_THRESHOLD, DEFAULT_VERSION};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("predictor `{name}` could not be constructed: {source}")]
    Construction {
        name: String,
        #[source]
        source: ConstructionError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Concrete model variants that can be assembled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    LogisticRegression {
        coefficients: Vec<f64>,
        intercept: f64,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

/// One predictor in a manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorEntry {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub model: ModelSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_schema: Option<Value>,
    pub test_input: Value,
    pub score_test_input: Value,
}

impl PredictorEntry {
    /// Construct the predictor this entry describes
    pub fn build(&self) -> Result<Predictor, ConstructionError> {
        match &self.model {
            ModelSpec::LogisticRegression {
                coefficients,
                intercept,
                threshold,
            } => {
                let model =
                    LogisticRegression::new(coefficients.clone(), *intercept).with_threshold(*threshold);
                let contract = Contract::from_documents(
                    self.prediction_schema
                        .clone()
                        .unwrap_or_else(|| model.prediction_schema()),
                    self.score_schema.clone().unwrap_or_else(|| model.score_schema()),
                    self.test_input.clone(),
                    self.score_test_input.clone(),
                )?;
                Predictor::new(model, self.name.clone(), self.version.clone(), contract)
            }
        }
    }
}

/// The set of predictors to serve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorManifest {
    pub predictors: Vec<PredictorEntry>,
}

impl PredictorManifest {
    pub fn from_json(content: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Two three-feature logistic regressions, `test_logreg1` and `test_logreg2`
    pub fn builtin() -> Self {
        let test_input = json!([[0.35, -1.2, 0.8], [-0.6, 0.4, 1.1]]);
        let score_test_input = json!([
            {"x": [1.2, -0.3, 0.5], "y": true},
            {"x": [-0.8, 0.9, -1.4], "y": false},
            {"x": [0.1, 0.2, -0.1], "y": true},
            {"x": [-1.5, -0.7, 0.3], "y": false},
            {"x": [0.6, 1.3, 0.9], "y": true},
            {"x": [-0.2, -1.1, -0.6], "y": false}
        ]);

        let entry = |name: &str, coefficients: Vec<f64>, intercept: f64| PredictorEntry {
            name: name.to_string(),
            version: default_version(),
            model: ModelSpec::LogisticRegression {
                coefficients,
                intercept,
                threshold: DEFAULT_THRESHOLD,
            },
            prediction_schema: None,
            score_schema: None,
            test_input: test_input.clone(),
            score_test_input: score_test_input.clone(),
        };

        Self {
            predictors: vec![
                entry("test_logreg1", vec![0.82, -0.15, 0.31], 0.05),
                entry("test_logreg2", vec![0.47, 0.22, -0.38], -0.12),
            ],
        }
    }

    /// Construct every predictor, failing on the first one that does not
    pub fn build(&self) -> Result<Vec<Predictor>, ManifestError> {
        self.predictors
            .iter()
            .map(|entry| {
                let predictor = entry.build().map_err(|source| ManifestError::Construction {
                    name: entry.name.clone(),
                    source,
                })?;
                debug!(predictor = %entry.name, version = %entry.version, "Predictor constructed");
                Ok(predictor)
            })
            .collect()
    }

    /// Construct every predictor into a registry with unique names
    pub fn build_registry(&self) -> Result<Registry, ManifestError> {
        Ok(Registry::with_unique_names(self.build()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_manifest_builds() {
        let registry = PredictorManifest::builtin().build_registry().unwrap();
        assert_eq!(registry.list(), vec!["test_logreg1", "test_logreg2"]);
        for predictor in registry.iter() {
            assert!(predictor.self_test());
            assert_eq!(predictor.version(), "v1");
        }
    }

    #[test]
    fn test_builtin_uses_derived_schemas() {
        let registry = PredictorManifest::builtin().build_registry().unwrap();
        let predictor = registry.select("test_logreg1").unwrap();
        assert_eq!(
            predictor.prediction_schema().document()["items"]["maxItems"],
            json!(3)
        );
        let err = predictor.predict(&json!([[1, 2]])).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = PredictorManifest::from_json(
            r#"{
                "predictors": [{
                    "name": "churn",
                    "version": "2024-06",
                    "model": {"kind": "logistic_regression", "coefficients": [1.0, 2.0], "intercept": 0.5},
                    "test_input": [[0.0, 1.0]],
                    "score_test_input": [{"x": [0.0, 1.0], "y": true}]
                }]
            }"#,
        )
        .unwrap();

        let entry = &manifest.predictors[0];
        assert_eq!(entry.version, "2024-06");
        assert_eq!(
            entry.model,
            ModelSpec::LogisticRegression {
                coefficients: vec![1.0, 2.0],
                intercept: 0.5,
                threshold: DEFAULT_THRESHOLD
            }
        );

        let predictors = manifest.build().unwrap();
        assert_eq!(predictors[0].name(), "churn");
        assert_eq!(predictors[0].predict(&json!([[0, 1]])).unwrap(), json!([true]));
    }

    #[test]
    fn test_bad_fixture_fails_assembly() {
        let mut manifest = PredictorManifest::builtin();
        manifest.predictors[1].test_input = json!([[1.0, 2.0]]);
        match manifest.build() {
            Err(ManifestError::Construction { name, source }) => {
                assert_eq!(name, "test_logreg2");
                assert!(matches!(source, ConstructionError::TestInput(_)));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_explicit_schema_overrides_derived() {
        let mut manifest = PredictorManifest::builtin();
        manifest.predictors[0].prediction_schema = Some(json!({"type": "sequence"}));
        assert!(matches!(
            manifest.build(),
            Err(ManifestError::Construction {
                source: ConstructionError::PredictionSchema(_),
                ..
            })
        ));
    }

    #[test]
    fn test_duplicate_names_fail_assembly() {
        let mut manifest = PredictorManifest::builtin();
        manifest.predictors[1].name = "test_logreg1".to_string();
        assert!(matches!(
            manifest.build_registry(),
            Err(ManifestError::Registry(RegistryError::DuplicateName(_)))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let content = serde_json::to_string(&PredictorManifest::builtin()).unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let manifest = PredictorManifest::from_path(file.path()).unwrap();
        assert_eq!(manifest.predictors.len(), 2);

        let missing = PredictorManifest::from_path("/nonexistent/manifest.json");
        assert!(matches!(missing, Err(ManifestError::Io { .. })));
    }
}
