//! Predictor serving library
//!
//! This crate provides the core functionality for:
//! - Schema validation of prediction and score payloads
//! - The predictor contract (construction self-test, predict/score pipeline)
//! - Name-based predictor selection
//! - Health, readiness and uptime reporting
//! - Manifest-driven assembly and observability

pub mod error;
pub mod health;
pub mod manifest;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod registry;
pub mod schema;

pub use error::{
    Capability, ConstructionError, ModelError, PredictorError, RegistryError, SelectionError,
};
pub use health::{process_start, HealthAggregator, HealthResponse, ReadinessResponse};
pub use manifest::{ManifestError, ModelSpec, PredictorEntry, PredictorManifest};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{Contract, LogisticRegression, Model, Predictor, DEFAULT_VERSION};
pub use registry::Registry;
pub use schema::{validate, Schema, SchemaError, SchemaViolation};
