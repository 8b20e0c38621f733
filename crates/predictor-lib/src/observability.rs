//! Observability infrastructure for the predictor service
//!
//! Provides:
//! - Prometheus metrics (prediction/score latency, request errors, self-test failures)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: HistogramVec,
    score_latency_seconds: HistogramVec,
    request_errors: IntCounterVec,
    self_test_failures: IntCounterVec,
    predictors_registered: IntGauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram_vec!(
                "predictor_prediction_latency_seconds",
                "Time spent serving prediction requests",
                &["predictor"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            score_latency_seconds: register_histogram_vec!(
                "predictor_score_latency_seconds",
                "Time spent serving score requests",
                &["predictor"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register score_latency_seconds"),

            request_errors: register_int_counter_vec!(
                "predictor_request_errors_total",
                "Requests that failed, by error kind",
                &["kind"]
            )
            .expect("Failed to register request_errors"),

            self_test_failures: register_int_counter_vec!(
                "predictor_self_test_failures_total",
                "Readiness self-tests that did not pass",
                &["predictor"]
            )
            .expect("Failed to register self_test_failures"),

            predictors_registered: register_int_gauge!(
                "predictor_registered_predictors",
                "Number of predictors in the registry"
            )
            .expect("Failed to register predictors_registered"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, predictor: &str, duration_secs: f64) {
        self.inner()
            .prediction_latency_seconds
            .with_label_values(&[predictor])
            .observe(duration_secs);
    }

    pub fn observe_score_latency(&self, predictor: &str, duration_secs: f64) {
        self.inner()
            .score_latency_seconds
            .with_label_values(&[predictor])
            .observe(duration_secs);
    }

    pub fn inc_request_errors(&self, kind: &str) {
        self.inner().request_errors.with_label_values(&[kind]).inc();
    }

    pub fn inc_self_test_failures(&self, predictor: &str) {
        self.inner()
            .self_test_failures
            .with_label_values(&[predictor])
            .inc();
    }

    pub fn set_predictors_registered(&self, count: i64) {
        self.inner().predictors_registered.set(count);
    }
}

/// Structured logger for service lifecycle events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, predictor_count: usize) {
        info!(
            event = "service_started",
            service = %self.service,
            service_version = %version,
            predictor_count = predictor_count,
            "Predictor service started"
        );
    }

    pub fn log_predictor_registered(&self, name: &str, version: &str, created: &str) {
        info!(
            event = "predictor_registered",
            service = %self.service,
            predictor = %name,
            predictor_version = %version,
            created = %created,
            "Predictor passed its self-test and was registered"
        );
    }

    pub fn log_self_test_failed(&self, name: &str) {
        warn!(
            event = "self_test_failed",
            service = %self.service,
            predictor = %name,
            "Predictor failed its readiness self-test"
        );
    }

    pub fn log_request_failed(&self, operation: &str, predictor: &str, kind: &str, message: &str) {
        if kind == "validation" || kind == "not_found" {
            info!(
                event = "request_rejected",
                service = %self.service,
                operation = %operation,
                predictor = %predictor,
                kind = %kind,
                message = %message,
                "Request rejected"
            );
        } else {
            error!(
                event = "request_failed",
                service = %self.service,
                operation = %operation,
                predictor = %predictor,
                kind = %kind,
                message = %message,
                "Request failed on the server side"
            );
        }
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Predictor service shutting down"
        );
    }
}
