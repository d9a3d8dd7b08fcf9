// ecommbot_ingest/src/cli.rs
// Command Line Interface (CLI) specific logic for ecommbot_ingest.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConnectionSettings, ENV_API_ENDPOINT, ENV_APPLICATION_TOKEN, ENV_KEYSPACE};
use crate::ingestor::{IngestMode, IngestorConfig};

/// Loads product reviews into an Astra DB vector collection and runs a demo query.
///
/// With no arguments: fresh ingest of the default dataset, then the demo query.
#[derive(Parser, Debug,)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Insert the dataset (`fresh`) or reuse the stored collection (`attach`).
    #[clap(long, value_enum, default_value_t = IngestMode::Fresh)]
    pub mode: IngestMode,

    /// Path to the CSV dataset of product reviews
    #[clap(long, env = "ECOMMBOT_DATASET", default_value = crate::DEFAULT_DATASET_PATH)]
    pub dataset: PathBuf,

    /// Name of the vector collection
    #[clap(long, env = "ASTRA_DB_COLLECTION", default_value = crate::DEFAULT_COLLECTION_NAME)]
    pub collection: String,

    /// Query to run against the collection once ingestion is done
    #[clap(long, default_value = crate::DEFAULT_DEMO_QUERY)]
    pub query: String,

    /// Number of results to print for the query
    #[clap(long, default_value_t = crate::DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Write a structured summary (ingestion_report.json) at the end.
    #[clap(long)]
    pub report: bool,

    /// Astra DB Data API endpoint
    #[clap(long, env = ENV_API_ENDPOINT, hide_env_values = true)]
    pub api_endpoint: Option<String,>,

    /// Astra DB application token
    #[clap(long, env = ENV_APPLICATION_TOKEN, hide_env_values = true)]
    pub token: Option<String,>,

    /// Astra DB keyspace (namespace) holding the collection
    #[clap(long, env = ENV_KEYSPACE)]
    pub keyspace: Option<String,>,

    /// Hugging Face token for the inference API
    #[clap(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String,>,
}

impl Cli {
    pub fn ingestor_config(&self,) -> IngestorConfig {
        IngestorConfig {
            connection:      ConnectionSettings {
                api_endpoint: self.api_endpoint.clone(),
                token:        self.token.clone(),
                keyspace:     self.keyspace.clone(),
            },
            collection_name: self.collection.clone(),
        }
    }
}
