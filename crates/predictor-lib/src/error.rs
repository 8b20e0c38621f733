//! Error taxonomy for predictors, selection and assembly
//!
//! Client-caused errors (`SchemaViolation`, `SelectionError::NotFound`) carry
//! what the caller needs to fix the request. Everything else is a server-side
//! defect. Self-test outcomes are never errors; see [`crate::Predictor::self_test`].

use crate::schema::{SchemaError, SchemaViolation};
use std::fmt;
use thiserror::Error;

/// Capabilities a model variant may supply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ConvertPredictionInput,
    ConvertScoreInput,
    RunScores,
    Infer,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ConvertPredictionInput => "convert_prediction_input",
            Capability::ConvertScoreInput => "convert_score_input",
            Capability::RunScores => "run_scores",
            Capability::Infer => "infer",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a model variant
#[derive(Debug, Error)]
pub enum ModelError {
    /// The variant does not provide this capability
    #[error("capability `{0}` is not implemented")]
    NotImplemented(Capability),

    /// The result could not be converted to JSON
    #[error("result is not serializable: {0}")]
    NotSerializable(#[source] serde_json::Error),

    /// The model itself failed
    #[error("{0}")]
    Failed(String),
}

impl ModelError {
    pub fn failed(message: impl Into<String>) -> Self {
        ModelError::Failed(message.into())
    }
}

/// Errors raised by `predict` and `score`
#[derive(Debug, Error)]
pub enum PredictorError {
    /// The payload does not match the declared schema
    #[error("invalid payload: {0}")]
    Validation(#[from] SchemaViolation),

    /// The model variant is missing a capability it needs to serve this call
    #[error("predictor is misconfigured: please provide an implementation of `{0}`")]
    Misconfigured(Capability),

    /// The converted result cannot be sent over the wire
    #[error("predictor produced a result that is not serializable: {0}")]
    NotSerializable(#[source] serde_json::Error),

    /// The underlying model failed
    #[error("model failure: {0}")]
    Model(String),
}

impl From<ModelError> for PredictorError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NotImplemented(capability) => PredictorError::Misconfigured(capability),
            ModelError::NotSerializable(e) => PredictorError::NotSerializable(e),
            ModelError::Failed(message) => PredictorError::Model(message),
        }
    }
}

impl PredictorError {
    /// Returns true for errors the caller caused
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictorError::Validation(_))
    }

    /// Short machine-readable label, used for metrics and error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            PredictorError::Validation(_) => "validation",
            PredictorError::Misconfigured(_) => "misconfigured",
            PredictorError::NotSerializable(_) => "not_serializable",
            PredictorError::Model(_) => "model",
        }
    }
}

/// Reasons a predictor could not be constructed
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("prediction schema is malformed: {0}")]
    PredictionSchema(#[source] SchemaError),

    #[error("score schema is malformed: {0}")]
    ScoreSchema(#[source] SchemaError),

    #[error("test input does not match the prediction schema: {0}")]
    TestInput(#[source] SchemaViolation),

    #[error("score test input does not match the score schema: {0}")]
    ScoreTestInput(#[source] SchemaViolation),

    #[error("predictor `{0}` failed its self-test")]
    SelfTestFailed(String),

    #[error("predictor `{name}` raised an unexpected error during its self-test: {source}")]
    SelfTestError {
        name: String,
        #[source]
        source: PredictorError,
    },
}

/// Name resolution failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// No predictor has this name
    #[error("Model {0} not found")]
    NotFound(String),

    /// More than one predictor has this name
    #[error("Model {name} not unique ({count} predictors share this name)")]
    Ambiguous { name: String, count: usize },
}

impl SelectionError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, SelectionError::NotFound(_))
    }
}

/// Registry assembly failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("predictor name `{0}` is registered more than once")]
    DuplicateName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_maps_to_predictor_error() {
        let err: PredictorError = ModelError::NotImplemented(Capability::Infer).into();
        assert!(matches!(err, PredictorError::Misconfigured(Capability::Infer)));
        assert!(err.to_string().contains("`infer`"));
        assert!(!err.is_client_error());

        let err: PredictorError = ModelError::failed("width mismatch").into();
        assert_eq!(err.kind(), "model");
    }

    #[test]
    fn test_selection_error_classification() {
        assert!(SelectionError::NotFound("a".into()).is_client_error());
        let ambiguous = SelectionError::Ambiguous {
            name: "a".into(),
            count: 2,
        };
        assert!(!ambiguous.is_client_error());
        assert_eq!(ambiguous.to_string(), "Model a not unique (2 predictors share this name)");
    }
}
