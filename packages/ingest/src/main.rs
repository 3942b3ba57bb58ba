#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the SOS message preprocessing tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sos_map_config::Config;
use sos_map_ingest::{IngestStats, Pipeline, read_messages, run};
use sos_map_maps::google::GoogleMapsClient;
use sos_map_store::IncidentStore;

#[derive(Parser)]
#[command(name = "sos_map_ingest", about = "SOS message preprocessing tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse, geocode, and score raw SOS messages into the incident store
    Process {
        /// CSV file with `id` and `message` columns
        #[arg(long, default_value = "sos_messages.csv")]
        input: PathBuf,
        /// Output JSON file (defaults to `SOS_DATA_FILE`)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Number of messages processed at once
        #[arg(long, default_value = "1")]
        concurrency: usize,
        /// Only process the first N messages
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Summarise an existing incident store
    Stats {
        /// Incident store JSON file (defaults to `SOS_DATA_FILE` or
        /// `processed_data.json`)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            output,
            concurrency,
            limit,
        } => {
            let config = Config::from_env()?;

            let mut messages = read_messages(&input)?;
            if let Some(limit) = limit {
                messages.truncate(limit);
            }
            log::info!("Loaded {} messages from {}", messages.len(), input.display());

            let llm = sos_map_ai::providers::create_provider(&config.llm, config.http_timeout)?;
            let maps = GoogleMapsClient::new(config.maps_api_key.clone(), config.http_timeout)?;
            let store = IncidentStore::new(output.unwrap_or_else(|| config.data_file.clone()));

            let pipeline = Pipeline {
                llm: llm.as_ref(),
                maps: &maps,
                region: &config.geocode_region,
            };
            run(&pipeline, &messages, concurrency, &store).await?;
        }
        Commands::Stats { file } => {
            let path = file.unwrap_or_else(Config::data_file_from_env);
            let incidents = IncidentStore::new(path).load().await?;
            let stats = IngestStats::from_incidents(&incidents);

            log::info!(
                "{} records: {} failed analysis, {} without coordinates, {} listable",
                stats.total,
                stats.failed,
                stats.unlocated,
                stats.listable
            );
        }
    }

    Ok(())
}
