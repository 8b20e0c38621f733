//! Predictor contract
//!
//! A [`Model`] supplies the capabilities of a concrete inference variant.
//! A [`Predictor`] wraps a model with its schemas and self-test fixtures and
//! owns the shared orchestration:
//!
//! - construction validates the fixtures and runs a self-test, so a predictor
//!   that exists is a predictor that works
//! - `predict` and `score` validate the payload before any conversion
//! - `self_test` drives the same entry points as live traffic and reduces the
//!   outcome to a boolean

mod logreg;

pub use logreg::{LogisticRegression, DEFAULT_THRESHOLD};

use crate::error::{Capability, ConstructionError, ModelError, PredictorError};
use crate::schema::Schema;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Version tag used when none is given
pub const DEFAULT_VERSION: &str = "v1";

/// Capability set of a concrete model variant
///
/// Every capability except `convert_output` fails with
/// [`ModelError::NotImplemented`] unless the variant overrides it.
/// `convert_output` defaults to serializing the result as-is.
///
/// Inference takes `&self`: implementations must not mutate the model and
/// must be safe to call from several requests at once.
pub trait Model: Send + Sync + 'static {
    type Input;
    type Output: Serialize;
    type Features;
    type Labels;
    type Metric: Serialize;

    /// Convert a schema-valid prediction payload into model input
    fn convert_prediction_input(&self, _raw: &Value) -> Result<Self::Input, ModelError> {
        Err(ModelError::NotImplemented(Capability::ConvertPredictionInput))
    }

    /// Convert a model result into JSON
    fn convert_output(&self, result: Self::Output) -> Result<Value, ModelError> {
        serde_json::to_value(result).map_err(ModelError::NotSerializable)
    }

    /// Split a schema-valid score payload into features and labels
    fn convert_score_input(
        &self,
        _raw: &Value,
    ) -> Result<(Self::Features, Self::Labels), ModelError> {
        Err(ModelError::NotImplemented(Capability::ConvertScoreInput))
    }

    /// Compute the monitoring metric for labelled data
    fn run_scores(
        &self,
        _features: Self::Features,
        _labels: Self::Labels,
    ) -> Result<Self::Metric, ModelError> {
        Err(ModelError::NotImplemented(Capability::RunScores))
    }

    /// Run inference
    fn infer(&self, _input: Self::Input) -> Result<Self::Output, ModelError> {
        Err(ModelError::NotImplemented(Capability::Infer))
    }
}

/// Type-erased conversion pipeline over any [`Model`]
trait Pipeline: Send + Sync {
    fn predict(&self, payload: &Value) -> Result<Value, ModelError>;
    fn score(&self, payload: &Value) -> Result<Value, ModelError>;
}

impl<M: Model> Pipeline for M {
    fn predict(&self, payload: &Value) -> Result<Value, ModelError> {
        let input = self.convert_prediction_input(payload)?;
        let result = self.infer(input)?;
        self.convert_output(result)
    }

    fn score(&self, payload: &Value) -> Result<Value, ModelError> {
        let (features, labels) = self.convert_score_input(payload)?;
        let metric = self.run_scores(features, labels)?;
        serde_json::to_value(metric).map_err(ModelError::NotSerializable)
    }
}

/// Schemas and self-test fixtures a predictor is held to
#[derive(Debug, Clone)]
pub struct Contract {
    pub prediction_schema: Schema,
    pub score_schema: Schema,
    /// A prediction payload that must succeed
    pub test_input: Value,
    /// A score payload that must succeed
    pub score_test_input: Value,
}

impl Contract {
    pub fn new(
        prediction_schema: Schema,
        score_schema: Schema,
        test_input: Value,
        score_test_input: Value,
    ) -> Self {
        Self {
            prediction_schema,
            score_schema,
            test_input,
            score_test_input,
        }
    }

    /// Build a contract from raw schema documents
    pub fn from_documents(
        prediction_schema: Value,
        score_schema: Value,
        test_input: Value,
        score_test_input: Value,
    ) -> Result<Self, ConstructionError> {
        let prediction_schema =
            Schema::from_value(prediction_schema).map_err(ConstructionError::PredictionSchema)?;
        let score_schema =
            Schema::from_value(score_schema).map_err(ConstructionError::ScoreSchema)?;
        Ok(Self::new(
            prediction_schema,
            score_schema,
            test_input,
            score_test_input,
        ))
    }

    fn check_fixtures(&self) -> Result<(), ConstructionError> {
        self.prediction_schema
            .validate(&self.test_input)
            .map_err(ConstructionError::TestInput)?;
        self.score_schema
            .validate(&self.score_test_input)
            .map_err(ConstructionError::ScoreTestInput)?;
        Ok(())
    }
}

fn run_predict(
    model: &dyn Pipeline,
    contract: &Contract,
    input: &Value,
) -> Result<Value, PredictorError> {
    contract.prediction_schema.validate(input)?;
    Ok(model.predict(input)?)
}

fn run_score(
    model: &dyn Pipeline,
    contract: &Contract,
    input: &Value,
) -> Result<Value, PredictorError> {
    contract.score_schema.validate(input)?;
    Ok(model.score(input)?)
}

/// Runs both fixtures through the live entry points.
///
/// Validation, misconfiguration and serialization failures mean "not
/// working" and yield `Ok(false)`. Anything else is returned as an error.
fn try_self_test(model: &dyn Pipeline, contract: &Contract) -> Result<bool, PredictorError> {
    let outcome = run_predict(model, contract, &contract.test_input)
        .and_then(|prediction| to_wire(&prediction))
        .and_then(|_| run_score(model, contract, &contract.score_test_input))
        .and_then(|metric| to_wire(&metric));

    match outcome {
        Ok(_) => Ok(true),
        Err(err @ PredictorError::Validation(_))
        | Err(err @ PredictorError::Misconfigured(_))
        | Err(err @ PredictorError::NotSerializable(_)) => {
            debug!(error = %err, "Self-test did not pass");
            Ok(false)
        }
        Err(err @ PredictorError::Model(_)) => Err(err),
    }
}

fn to_wire(value: &Value) -> Result<Vec<u8>, PredictorError> {
    serde_json::to_vec(value).map_err(PredictorError::NotSerializable)
}

/// A named, versioned, schema-validated inference unit
pub struct Predictor {
    name: String,
    version: String,
    created: DateTime<Utc>,
    model: Box<dyn Pipeline>,
    contract: Contract,
}

impl fmt::Debug for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predictor")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

impl Predictor {
    /// Construct a predictor, proving it works first
    ///
    /// Fails if either fixture violates its schema or if the self-test does
    /// not pass. No predictor is produced on failure.
    pub fn new<M: Model>(
        model: M,
        name: impl Into<String>,
        version: impl Into<String>,
        contract: Contract,
    ) -> Result<Self, ConstructionError> {
        let name = name.into();
        contract.check_fixtures()?;

        let model: Box<dyn Pipeline> = Box::new(model);
        match try_self_test(model.as_ref(), &contract) {
            Ok(true) => {}
            Ok(false) => return Err(ConstructionError::SelfTestFailed(name)),
            Err(source) => return Err(ConstructionError::SelfTestError { name, source }),
        }

        Ok(Self {
            name,
            version: version.into(),
            created: Utc::now(),
            model,
            contract,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Construction timestamp (UTC)
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn prediction_schema(&self) -> &Schema {
        &self.contract.prediction_schema
    }

    pub fn score_schema(&self) -> &Schema {
        &self.contract.score_schema
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// Validate, convert, infer and convert back
    pub fn predict(&self, input: &Value) -> Result<Value, PredictorError> {
        let start = Instant::now();
        let result = run_predict(self.model.as_ref(), &self.contract, input);
        debug!(
            predictor = %self.name,
            elapsed_us = start.elapsed().as_micros() as u64,
            ok = result.is_ok(),
            "Prediction completed"
        );
        result
    }

    /// Validate, convert and compute the monitoring metric
    pub fn score(&self, input: &Value) -> Result<Value, PredictorError> {
        let start = Instant::now();
        let result = run_score(self.model.as_ref(), &self.contract, input);
        debug!(
            predictor = %self.name,
            elapsed_us = start.elapsed().as_micros() as u64,
            ok = result.is_ok(),
            "Scoring completed"
        );
        result
    }

    /// Self-test that surfaces unexpected model failures
    pub fn try_self_test(&self) -> Result<bool, PredictorError> {
        try_self_test(self.model.as_ref(), &self.contract)
    }

    /// Run the construction fixtures through `predict` and `score`
    ///
    /// Never fails: an unexpected model error is logged and reported as
    /// `false`. Recomputed on every call.
    pub fn self_test(&self) -> bool {
        match self.try_self_test() {
            Ok(true) => true,
            Ok(false) => {
                warn!(predictor = %self.name, "Self-test failed");
                false
            }
            Err(err) => {
                error!(predictor = %self.name, error = %err, "Self-test raised an unexpected error");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Small models for exercising the contract

    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    pub fn sum_contract() -> Contract {
        Contract::from_documents(
            json!({"type": "array", "minItems": 3, "maxItems": 3, "items": {"type": "number"}}),
            json!({"type": "object", "properties": {"x": {"type": "array"}, "y": {"type": "number"}}, "required": ["x", "y"]}),
            json!([1, 2, 3]),
            json!({"x": [1, 2, 3], "y": 6}),
        )
        .unwrap()
    }

    /// Sums its input; can be switched to failing at any time
    #[derive(Clone, Default)]
    pub struct Summer {
        pub conversions: Arc<AtomicUsize>,
        pub broken: Arc<AtomicBool>,
    }

    impl Model for Summer {
        type Input = Vec<f64>;
        type Output = f64;
        type Features = Vec<f64>;
        type Labels = f64;
        type Metric = f64;

        fn convert_prediction_input(&self, raw: &Value) -> Result<Vec<f64>, ModelError> {
            self.conversions.fetch_add(1, Ordering::SeqCst);
            if self.broken.load(Ordering::SeqCst) {
                return Err(ModelError::NotImplemented(Capability::ConvertPredictionInput));
            }
            serde_json::from_value(raw.clone()).map_err(|e| ModelError::failed(e.to_string()))
        }

        fn infer(&self, input: Vec<f64>) -> Result<f64, ModelError> {
            Ok(input.iter().sum())
        }

        fn convert_score_input(&self, raw: &Value) -> Result<(Vec<f64>, f64), ModelError> {
            let x = serde_json::from_value(raw["x"].clone())
                .map_err(|e| ModelError::failed(e.to_string()))?;
            let y = raw["y"].as_f64().unwrap_or_default();
            Ok((x, y))
        }

        fn run_scores(&self, features: Vec<f64>, label: f64) -> Result<f64, ModelError> {
            Ok((features.iter().sum::<f64>() - label).abs())
        }
    }

    pub fn summer(name: &str) -> (Predictor, Summer) {
        let model = Summer::default();
        let predictor = Predictor::new(model.clone(), name, DEFAULT_VERSION, sum_contract()).unwrap();
        (predictor, model)
    }

    pub fn break_model(model: &Summer) {
        model.broken.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    /// Provides no capabilities at all
    struct Bare;

    impl Model for Bare {
        type Input = ();
        type Output = ();
        type Features = ();
        type Labels = ();
        type Metric = ();
    }

    /// Predicts but cannot score
    struct PredictOnly;

    impl Model for PredictOnly {
        type Input = Value;
        type Output = Value;
        type Features = ();
        type Labels = ();
        type Metric = ();

        fn convert_prediction_input(&self, raw: &Value) -> Result<Value, ModelError> {
            Ok(raw.clone())
        }

        fn infer(&self, input: Value) -> Result<Value, ModelError> {
            Ok(input)
        }
    }

    /// Produces a result with non-string map keys
    struct Unserializable;

    impl Model for Unserializable {
        type Input = ();
        type Output = BTreeMap<(i32, i32), f64>;
        type Features = ();
        type Labels = ();
        type Metric = f64;

        fn convert_prediction_input(&self, _raw: &Value) -> Result<(), ModelError> {
            Ok(())
        }

        fn infer(&self, _input: ()) -> Result<Self::Output, ModelError> {
            Ok(BTreeMap::from([((0, 1), 0.5)]))
        }

        fn convert_score_input(&self, _raw: &Value) -> Result<((), ()), ModelError> {
            Ok(((), ()))
        }

        fn run_scores(&self, _features: (), _labels: ()) -> Result<f64, ModelError> {
            Ok(1.0)
        }
    }

    /// Inference always fails
    struct Crashing;

    impl Model for Crashing {
        type Input = ();
        type Output = ();
        type Features = ();
        type Labels = ();
        type Metric = ();

        fn convert_prediction_input(&self, _raw: &Value) -> Result<(), ModelError> {
            Ok(())
        }

        fn infer(&self, _input: ()) -> Result<(), ModelError> {
            Err(ModelError::failed("weights are corrupt"))
        }
    }

    #[test]
    fn test_constructed_predictor_passes_self_test() {
        let (predictor, _) = summer("sum");
        assert_eq!(predictor.name(), "sum");
        assert_eq!(predictor.version(), DEFAULT_VERSION);
        assert!(predictor.created() <= Utc::now());
        assert!(predictor.self_test());
    }

    #[test]
    fn test_invalid_test_input_aborts_construction() {
        let mut contract = sum_contract();
        contract.test_input = json!([1, 2]);
        let err = Predictor::new(Summer::default(), "sum", "v1", contract).unwrap_err();
        assert!(matches!(err, ConstructionError::TestInput(_)));
    }

    #[test]
    fn test_invalid_score_test_input_aborts_construction() {
        let mut contract = sum_contract();
        contract.score_test_input = json!({"x": [1, 2, 3]});
        let err = Predictor::new(Summer::default(), "sum", "v1", contract).unwrap_err();
        assert!(matches!(err, ConstructionError::ScoreTestInput(_)));
    }

    #[test]
    fn test_fixture_check_runs_before_any_conversion() {
        let model = Summer::default();
        let mut contract = sum_contract();
        contract.test_input = json!("not an array");
        assert!(Predictor::new(model.clone(), "sum", "v1", contract).is_err());
        assert_eq!(model.conversions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_capabilities_fail_construction() {
        let err = Predictor::new(Bare, "bare", "v1", sum_contract()).unwrap_err();
        assert!(matches!(err, ConstructionError::SelfTestFailed(ref name) if name == "bare"));

        let err = Predictor::new(PredictOnly, "half", "v1", sum_contract()).unwrap_err();
        assert!(matches!(err, ConstructionError::SelfTestFailed(_)));
    }

    #[test]
    fn test_unserializable_output_fails_construction() {
        let err = Predictor::new(Unserializable, "odd", "v1", sum_contract()).unwrap_err();
        assert!(matches!(err, ConstructionError::SelfTestFailed(_)));
    }

    #[test]
    fn test_model_failure_is_not_swallowed_at_construction() {
        let err = Predictor::new(Crashing, "crash", "v1", sum_contract()).unwrap_err();
        match err {
            ConstructionError::SelfTestError { name, source } => {
                assert_eq!(name, "crash");
                assert!(matches!(source, PredictorError::Model(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_schema_document() {
        let err = Contract::from_documents(
            json!({"type": "vector"}),
            json!({}),
            json!([]),
            json!({}),
        )
        .unwrap_err();
        assert!(matches!(err, ConstructionError::PredictionSchema(_)));
    }

    #[test]
    fn test_predict_runs_pipeline() {
        let (predictor, _) = summer("sum");
        assert_eq!(predictor.predict(&json!([1, 2, 3.5])).unwrap(), json!(6.5));
    }

    #[test]
    fn test_predict_validates_before_converting() {
        let (predictor, model) = summer("sum");
        let before = model.conversions.load(Ordering::SeqCst);

        let err = predictor.predict(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, PredictorError::Validation(_)));
        assert!(err.is_client_error());
        assert_eq!(model.conversions.load(Ordering::SeqCst), before);

        predictor.predict(&json!([1, 2, 3])).unwrap();
        assert_eq!(model.conversions.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_score_runs_pipeline() {
        let (predictor, _) = summer("sum");
        let metric = predictor.score(&json!({"x": [1, 2, 3], "y": 5})).unwrap();
        assert_eq!(metric, json!(1.0));

        let err = predictor.score(&json!({"x": [1, 2, 3]})).unwrap_err();
        assert!(matches!(err, PredictorError::Validation(_)));
    }

    #[test]
    fn test_unreadable_input_is_a_model_failure() {
        let (predictor, _) = summer("sum");
        let err = predictor
            .score(&json!({"x": ["one", "two"], "y": 3}))
            .unwrap_err();
        assert!(matches!(err, PredictorError::Model(_)));
        assert_eq!(err.kind(), "model");
    }

    #[test]
    fn test_missing_capability_at_request_time_is_server_error() {
        let (predictor, model) = summer("sum");
        break_model(&model);
        let err = predictor.predict(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(
            err,
            PredictorError::Misconfigured(Capability::ConvertPredictionInput)
        ));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_self_test_is_boolean_and_idempotent() {
        let (predictor, model) = summer("sum");
        assert!(predictor.self_test());
        assert!(predictor.self_test());

        break_model(&model);
        assert!(!predictor.self_test());
        assert!(!predictor.self_test());
        assert!(!predictor.try_self_test().unwrap());
    }

    #[test]
    fn test_schemas_are_exposed_as_declared() {
        let (predictor, _) = summer("sum");
        assert_eq!(predictor.prediction_schema().document()["maxItems"], json!(3));
        assert_eq!(predictor.score_schema().document()["required"], json!(["x", "y"]));
        assert_eq!(predictor.contract().test_input, json!([1, 2, 3]));
    }

    #[test]
    fn test_shared_predictor_serves_concurrent_callers() {
        let (predictor, model) = summer("sum");
        let predictor = Arc::new(predictor);
        let before = model.conversions.load(Ordering::SeqCst);

        std::thread::scope(|scope| {
            for i in 0..8 {
                let predictor = Arc::clone(&predictor);
                scope.spawn(move || {
                    for _ in 0..25 {
                        if i % 2 == 0 {
                            assert_eq!(predictor.predict(&json!([1, 2, 3])).unwrap(), json!(6.0));
                        } else {
                            assert!(predictor.self_test());
                        }
                    }
                });
            }
        });

        // predict converts once per call, self_test once per call
        assert_eq!(model.conversions.load(Ordering::SeqCst), before + 8 * 25);
    }
}
