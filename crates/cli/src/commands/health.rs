//! Health and inventory commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_ready, format_duration, print_error, print_json, print_success, print_table,
    OutputFormat,
};

/// Row for the predictor readiness table
#[derive(Tabled)]
struct ReadinessRow {
    #[tabled(rename = "Predictor")]
    predictor: String,
    #[tabled(rename = "Self-test")]
    status: String,
}

/// Row for the predictor list
#[derive(Tabled)]
struct NameRow {
    #[tabled(rename = "Predictor")]
    name: String,
}

/// List registered predictors
pub async fn list(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let names = client.list().await?;

    match format {
        OutputFormat::Json => print_json(&names)?,
        OutputFormat::Table => {
            let rows: Vec<NameRow> = names.into_iter().map(|name| NameRow { name }).collect();
            print_table(&rows);
        }
    }

    Ok(())
}

/// Show liveness, per-predictor readiness and uptime
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("{}", "Service Health".bold());
            println!("{}", "=".repeat(40));
            let live = if health.live {
                "LIVE".green()
            } else {
                "STARTING".yellow()
            };
            println!("Liveness:   {}", live);
            println!("Uptime:     {}", format_duration(health.uptime));
            println!();

            let rows: Vec<ReadinessRow> = health
                .ready
                .iter()
                .map(|(name, ready)| ReadinessRow {
                    predictor: name.clone(),
                    status: color_ready(*ready),
                })
                .collect();
            print_table(&rows);
        }
    }

    Ok(())
}

/// Check readiness of one predictor, or of all of them
///
/// Returns false when the server reports the target as not ready.
pub async fn check_ready(
    client: &ApiClient,
    model: Option<&str>,
    format: OutputFormat,
) -> Result<bool> {
    let probe = match model {
        Some(name) => client.probe("health/ready", Some(name)).await?,
        None => client.probe("readyz", None).await?,
    };
    let target = model.unwrap_or("all predictors");

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "target": target,
            "status": probe.status,
            "detail": probe.body,
        }))?,
        OutputFormat::Table => {
            if probe.is_success() {
                print_success(&format!("{} ready", target));
            } else {
                print_error(&format!(
                    "{} not ready (HTTP {}): {}",
                    target,
                    probe.status,
                    probe.detail()
                ));
            }
        }
    }

    Ok(probe.is_success())
}

/// Show server uptime
pub async fn show_uptime(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let uptime = client.uptime().await?;

    match format {
        OutputFormat::Json => print_json(&uptime)?,
        OutputFormat::Table => println!("Uptime: {}", format_duration(uptime)),
    }

    Ok(())
}
