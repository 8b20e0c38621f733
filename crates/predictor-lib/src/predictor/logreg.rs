//! Pre-fitted binary logistic regression
//!
//! Prediction payloads are lists of feature rows; the model answers with one
//! boolean class per row. Score payloads are lists of `{"x": row, "y": bool}`
//! samples and the metric is mean accuracy.

use super::Model;
use crate::error::ModelError;
use serde::Deserialize;
use serde_json::{json, Value};

/// Probability at or above which a row is classified `true`
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Binary logistic regression with fixed coefficients
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticRegression {
    coefficients: Vec<f64>,
    intercept: f64,
    threshold: f64,
}

#[derive(Deserialize)]
struct LabelledRow {
    x: Vec<f64>,
    y: bool,
}

impl LogisticRegression {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    /// Schema for one feature row: exactly `n_features` numbers
    pub fn row_schema(&self) -> Value {
        json!({
            "type": "array",
            "minItems": self.n_features(),
            "maxItems": self.n_features(),
            "items": {"type": "number"}
        })
    }

    /// Schema for prediction payloads: one or more feature rows
    pub fn prediction_schema(&self) -> Value {
        json!({
            "type": "array",
            "minItems": 1,
            "items": self.row_schema()
        })
    }

    /// Schema for score payloads: one or more labelled rows
    pub fn score_schema(&self) -> Value {
        json!({
            "type": "array",
            "minItems": 1,
            "items": {
                "type": "object",
                "properties": {
                    "x": self.row_schema(),
                    "y": {"type": "boolean"}
                },
                "required": ["x", "y"]
            }
        })
    }

    /// Probability of the positive class for one row
    pub fn probability(&self, row: &[f64]) -> Result<f64, ModelError> {
        if row.len() != self.n_features() {
            return Err(ModelError::failed(format!(
                "row has {} features, model expects {}",
                row.len(),
                self.n_features()
            )));
        }
        let z: f64 = self
            .coefficients
            .iter()
            .zip(row)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;
        Ok(sigmoid(z))
    }

    fn classify(&self, rows: &[Vec<f64>]) -> Result<Vec<bool>, ModelError> {
        rows.iter()
            .map(|row| self.probability(row).map(|p| p >= self.threshold))
            .collect()
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn parse<T: serde::de::DeserializeOwned>(raw: &Value) -> Result<T, ModelError> {
    T::deserialize(raw).map_err(|e| ModelError::failed(format!("cannot read payload: {}", e)))
}

impl Model for LogisticRegression {
    type Input = Vec<Vec<f64>>;
    type Output = Vec<bool>;
    type Features = Vec<Vec<f64>>;
    type Labels = Vec<bool>;
    type Metric = f64;

    fn convert_prediction_input(&self, raw: &Value) -> Result<Vec<Vec<f64>>, ModelError> {
        parse(raw)
    }

    fn convert_score_input(
        &self,
        raw: &Value,
    ) -> Result<(Vec<Vec<f64>>, Vec<bool>), ModelError> {
        let rows: Vec<LabelledRow> = parse(raw)?;
        Ok(rows.into_iter().map(|r| (r.x, r.y)).unzip())
    }

    fn run_scores(&self, features: Vec<Vec<f64>>, labels: Vec<bool>) -> Result<f64, ModelError> {
        if features.is_empty() {
            return Err(ModelError::failed("cannot score an empty sample"));
        }
        let predicted = self.classify(&features)?;
        let correct = predicted
            .iter()
            .zip(&labels)
            .filter(|(p, y)| p == y)
            .count();
        Ok(correct as f64 / labels.len() as f64)
    }

    fn infer(&self, input: Vec<Vec<f64>>) -> Result<Vec<bool>, ModelError> {
        self.classify(&input)
    }
}
