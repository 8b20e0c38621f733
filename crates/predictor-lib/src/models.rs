//! Wire types shared by the server and its clients

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a predict or score request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Name of the predictor to use
    pub predictor: String,
    /// Payload validated against the predictor's schema
    pub payload: Value,
}

/// Error body returned by the HTTP layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}
