//! API client for the predictor server

use anyhow::{Context, Result};
use predictor_lib::{ErrorResponse, HealthResponse, PredictionRequest};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Outcome of a probe endpoint that answers with a status code
#[derive(Debug, Clone, PartialEq)]
pub struct Probe {
    pub status: u16,
    pub body: Value,
}

impl Probe {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Human-readable detail: the error message or the plain body
    pub fn detail(&self) -> String {
        match &self.body {
            Value::String(s) => s.clone(),
            Value::Object(map) => map
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| self.body.to_string()),
            other => other.to_string(),
        }
    }
}

/// API client for the predictor server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid server URL")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str, model: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.join(path).context("Invalid path")?;
        if let Some(model) = model {
            url.query_pairs_mut().append_pair("model", model);
        }
        Ok(url)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| format!("{} ({})", e.error, e.code))
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a GET request, optionally naming a predictor
    pub async fn get<T: DeserializeOwned>(&self, path: &str, model: Option<&str>) -> Result<T> {
        let url = self.url(path, model)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;
        Self::parse(response).await
    }

    /// Make a GET request and keep the status code instead of failing on it
    pub async fn probe(&self, path: &str, model: Option<&str>) -> Result<Probe> {
        let url = self.url(path, model)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status().as_u16();
        let text = response.text().await.context("Failed to read response")?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(Probe { status, body })
    }

    async fn post(&self, path: &str, request: &PredictionRequest) -> Result<Value> {
        let url = self.url(path, None)?;
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .context("Failed to send request")?;
        Self::parse(response).await
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        self.get("list", None).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("health", None).await
    }

    pub async fn uptime(&self) -> Result<f64> {
        self.get("health/uptime", None).await
    }

    pub async fn predict(&self, predictor: &str, payload: Value) -> Result<Value> {
        let request = PredictionRequest {
            predictor: predictor.to_string(),
            payload,
        };
        self.post("predict", &request).await
    }

    pub async fn score(&self, predictor: &str, payload: Value) -> Result<Value> {
        let request = PredictionRequest {
            predictor: predictor.to_string(),
            payload,
        };
        self.post("score", &request).await
    }
}
