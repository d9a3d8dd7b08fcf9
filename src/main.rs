// ecommbot_ingest/src/main.rs
// Entry point: ingest the review dataset, then query the collection once.

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use ecommbot_ingest::cli::Cli;
use ecommbot_ingest::converter::{ConversionRule, DataConverter};
use ecommbot_ingest::error::{IngestError, Result};
use ecommbot_ingest::ingestor::{AppContext, IngestMode};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Serialize,)]
struct RunReport {
    mode:           IngestMode,
    collection:     String,
    inserted_count: usize,
    query:          String,
    result_count:   usize,
    error:          Option<ReportedError,>,
}

#[derive(Serialize,)]
struct ReportedError {
    kind:    &'static str,
    message: String,
}

impl RunReport {
    fn new(cli: &Cli,) -> Self {
        Self {
            mode:           cli.mode,
            collection:     cli.collection.clone(),
            inserted_count: 0,
            query:          cli.query.clone(),
            result_count:   0,
            error:          None,
        }
    }

    fn save(&self, path: &Path,) -> Result<(),> {
        let json = serde_json::to_string_pretty(self,).map_err(|e| {
            IngestError::Other(format!("Failed to serialize run report: {}", e),)
        },)?;
        std::fs::write(path, json,)?;
        info!("Ingestion report saved to {}", path.display());
        Ok((),)
    }
}

const REPORT_PATH: &str = "ingestion_report.json";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(),> {
    let file_appender = tracing_appender::rolling::never(".", "ingest.log",);
    let (non_blocking, _guard,) = tracing_appender::non_blocking(file_appender,);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),),)
        .with(fmt::layer().with_writer(std::io::stderr,),)
        .with(fmt::layer().with_writer(non_blocking,).with_ansi(false,),)
        .init();

    if let Err(e,) = dotenvy::dotenv() {
        if !e.not_found() {
            error!("Failed to load .env: {}", e);
        }
    }

    let cli = Cli::parse();
    let mut report = RunReport::new(&cli,);

    let context = AppContext::init(cli.hf_token.clone(),);
    let res = run(&cli, &context, &mut report,).await;
    context.shutdown();

    let report_path = cli.report.then(|| Path::new(REPORT_PATH,),);
    finish(res, report, report_path,)
}

/// Records the run outcome in the report and writes it if asked. A report that
/// cannot be written is logged; the run's own result is what gets returned.
fn finish(res: Result<(),>, mut report: RunReport, report_path: Option<&Path,>,) -> Result<(),> {
    if let Err(e,) = &res {
        error!(kind = e.kind(), "Ingestion failed: {}", e);
        report.error = Some(ReportedError {
            kind:    e.kind(),
            message: e.to_string(),
        },);
    }

    if let Some(path,) = report_path {
        if let Err(e,) = report.save(path,) {
            error!("Failed to write {}: {}", path.display(), e);
        }
    }

    res
}

async fn run(cli: &Cli, context: &AppContext, report: &mut RunReport,) -> Result<(),> {
    let converter = DataConverter::new(&cli.dataset, ConversionRule::default(),);
    let ingestor = context.ingestor(cli.ingestor_config(), Arc::new(converter,),);

    let outcome = ingestor.ingest(cli.mode,).await?;
    report.inserted_count = outcome.inserted_ids.len();
    if cli.mode == IngestMode::Fresh {
        println!("\nInserted {} documents.", outcome.inserted_ids.len());
    }

    let results = outcome
        .collection
        .similarity_search(&cli.query, cli.top_k,)
        .await?;
    report.result_count = results.len();
    for res in &results {
        println!("{}", res);
    }

    Ok((),)
}
