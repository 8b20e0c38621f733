//! Predictor service CLI
//!
//! A command-line tool for listing predictors, checking their health and
//! sending prediction and score requests to a predictor server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, predictors};
use std::path::PathBuf;

/// Predictor service CLI
#[derive(Parser)]
#[command(name = "predictorctl")]
#[command(author, version, about = "CLI for the predictor service", long_about = None)]
pub struct Cli {
    /// Server URL (can also be set via PREDICTOR_URL or the config file)
    #[arg(long, env = "PREDICTOR_URL")]
    pub server_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered predictors
    List,

    /// Show liveness, per-predictor readiness and uptime
    Health,

    /// Check readiness (exits non-zero when not ready)
    Ready {
        /// Predictor name (checks all predictors if omitted)
        model: Option<String>,
    },

    /// Show server uptime
    Uptime,

    /// Show version and creation time of a predictor
    Info {
        /// Predictor name
        model: String,
    },

    /// Print a predictor's request schema
    Schema {
        /// Predictor name
        model: String,

        /// Show the score schema instead of the prediction schema
        #[arg(long)]
        score: bool,
    },

    /// Send a prediction request
    Predict {
        /// Predictor name
        model: String,

        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Send a score request
    Score {
        /// Predictor name
        model: String,

        #[command(flatten)]
        payload: PayloadArgs,
    },
}

#[derive(clap::Args)]
pub struct PayloadArgs {
    /// Inline JSON payload
    #[arg(long, short)]
    pub payload: Option<String>,

    /// File containing the JSON payload (`-` reads stdin)
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    fn read(&self) -> Result<serde_json::Value> {
        predictors::read_payload(self.payload.as_deref(), self.file.as_deref())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let server_url = config::Config::load()?.server_url(cli.server_url);
    let client = client::ApiClient::new(&server_url)?;

    match cli.command {
        Commands::List => health::list(&client, cli.format).await?,
        Commands::Health => health::show_health(&client, cli.format).await?,
        Commands::Ready { model } => {
            if !health::check_ready(&client, model.as_deref(), cli.format).await? {
                std::process::exit(1);
            }
        }
        Commands::Uptime => health::show_uptime(&client, cli.format).await?,
        Commands::Info { model } => predictors::show_info(&client, &model, cli.format).await?,
        Commands::Schema { model, score } => predictors::show_schema(&client, &model, score).await?,
        Commands::Predict { model, payload } => {
            predictors::predict(&client, &model, payload.read()?, cli.format).await?
        }
        Commands::Score { model, payload } => {
            predictors::score(&client, &model, payload.read()?, cli.format).await?
        }
    }

    Ok(())
}
