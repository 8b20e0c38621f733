//! Health reporting for the predictor service
//!
//! Derives liveness, readiness and uptime for Kubernetes-style probes.
//! Readiness is recomputed from every predictor's self-test on each call.

use crate::error::SelectionError;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// Monotonic process start time
///
/// The first call captures the instant; later calls return the same value.
/// Call it as early as possible during startup.
pub fn process_start() -> Instant {
    *PROCESS_START.get_or_init(Instant::now)
}

/// Readiness response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Predictors whose self-test did not pass
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failing: Vec<String>,
}

impl ReadinessResponse {
    fn ready() -> Self {
        Self {
            ready: true,
            reason: None,
            failing: Vec::new(),
        }
    }

    fn not_ready(reason: impl Into<String>) -> Self {
        Self {
            ready: false,
            reason: Some(reason.into()),
            failing: Vec::new(),
        }
    }
}

/// Overall health summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub live: bool,
    /// Self-test outcome per predictor name
    pub ready: BTreeMap<String, bool>,
    /// Seconds since process start
    pub uptime: f64,
}

/// Health aggregator over a predictor registry
#[derive(Debug, Clone)]
pub struct HealthAggregator {
    registry: Arc<Registry>,
    started_at: Instant,
    live: Arc<AtomicBool>,
}

impl HealthAggregator {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_start(registry, process_start())
    }

    pub fn with_start(registry: Arc<Registry>, started_at: Instant) -> Self {
        Self {
            registry,
            started_at,
            live: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark startup as complete
    pub fn mark_started(&self) {
        self.live.store(true, Ordering::Release);
    }

    /// True once startup has completed; never consults predictors
    pub fn liveness(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Readiness of a single predictor
    pub fn readiness(&self, name: &str) -> Result<ReadinessResponse, SelectionError> {
        let predictor = self.registry.select(name)?;
        if predictor.self_test() {
            Ok(ReadinessResponse::ready())
        } else {
            Ok(ReadinessResponse::not_ready("NOT_READY"))
        }
    }

    /// Ready iff every registered predictor passes its self-test
    pub fn readiness_all(&self) -> ReadinessResponse {
        let failing: Vec<String> = self
            .registry
            .iter()
            .filter(|p| !p.self_test())
            .map(|p| p.name().to_string())
            .collect();

        if failing.is_empty() {
            ReadinessResponse::ready()
        } else {
            ReadinessResponse {
                failing: failing.clone(),
                ..ReadinessResponse::not_ready(format!(
                    "Predictor(s) not ready: {}",
                    failing.join(", ")
                ))
            }
        }
    }

    /// Elapsed time since process start
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Liveness, per-predictor readiness and uptime in one response
    pub fn summary(&self) -> HealthResponse {
        let mut ready = BTreeMap::new();
        for predictor in self.registry.iter() {
            let passed = predictor.self_test();
            ready
                .entry(predictor.name().to_string())
                .and_modify(|r| *r = *r && passed)
                .or_insert(passed);
        }

        HealthResponse {
            live: self.liveness(),
            ready,
            uptime: self.uptime().as_secs_f64(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}
