//! Per-predictor commands: metadata, schemas, predict and score

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde_json::{json, Value};
use std::path::Path;

use crate::client::ApiClient;
use crate::output::{format_timestamp, print_info, print_json, OutputFormat};

/// Read a request payload from an inline JSON string or a file (`-` for stdin)
pub fn read_payload(inline: Option<&str>, file: Option<&Path>) -> Result<Value> {
    let content = match (inline, file) {
        (Some(_), Some(_)) => bail!("Use either --payload or --file, not both"),
        (Some(inline), None) => inline.to_string(),
        (None, Some(path)) if path == Path::new("-") => {
            std::io::read_to_string(std::io::stdin()).context("Failed to read payload from stdin")?
        }
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload file {}", path.display()))?,
        (None, None) => bail!("A payload is required (--payload or --file)"),
    };

    serde_json::from_str(&content).context("Payload is not valid JSON")
}

/// Show version and creation time of a predictor
pub async fn show_info(client: &ApiClient, model: &str, format: OutputFormat) -> Result<()> {
    let version: String = client.get("version", Some(model)).await?;
    let created: String = client.get("creation_time", Some(model)).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "name": model,
            "version": version,
            "created": created,
        }))?,
        OutputFormat::Table => {
            println!("{}", "Predictor".bold());
            println!("{}", "=".repeat(40));
            println!("Name:       {}", model.cyan());
            println!("Version:    {}", version);
            println!("Created:    {}", format_timestamp(&created).dimmed());
        }
    }

    Ok(())
}

/// Print the prediction or score schema of a predictor
pub async fn show_schema(client: &ApiClient, model: &str, score: bool) -> Result<()> {
    let path = if score { "score_schema" } else { "predict_schema" };
    let schema: Value = client.get(path, Some(model)).await?;
    print_json(&schema)
}

/// Run a prediction
pub async fn predict(
    client: &ApiClient,
    model: &str,
    payload: Value,
    format: OutputFormat,
) -> Result<()> {
    let result = client.predict(model, payload).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_info(&format!("Prediction from {}", model.cyan()));
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

/// Run a score (self-monitoring) request
pub async fn score(
    client: &ApiClient,
    model: &str,
    payload: Value,
    format: OutputFormat,
) -> Result<()> {
    let metric = client.score(model, payload).await?;

    match format {
        OutputFormat::Json => print_json(&metric)?,
        OutputFormat::Table => match metric.as_f64() {
            Some(value) => println!("{} {}: {:.4}", "Score".bold(), model.cyan(), value),
            None => println!("{}", serde_json::to_string_pretty(&metric)?),
        },
    }

    Ok(())
}
