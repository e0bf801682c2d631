//! Command-line front-end (C17): discovers input PDFs, skips already
//! ingested duplicates, and drives one batch through the pipeline with
//! a live progress bar and a Ctrl+C stop handler.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::PipelineConfig;
use crate::duplicate_detector::check_batch;
use crate::fee_extractor::HeuristicFeeExtractor;
use crate::file_mover::FilesystemMover;
use crate::identity::{derive_document_id, is_supported_input};
use crate::llm::HttpLanguageModel;
use crate::models::InputTask;
use crate::pipeline::{Collaborators, Pipeline, TracingNotifier};
use crate::raster::PdftoppmRasterizer;
use crate::repository::{AsyncSqlitePool, BatchStore, DocumentStore, Persistor};
use crate::text_extract::CliTextExtractor;
use crate::transliteration::AsciiFoldTransliterator;
use crate::vision::{BottomRegionTableDetector, GeminiVisionModel};

#[derive(Parser)]
#[command(name = "deedpipe")]
#[command(about = "Batch OCR and structured extraction for property-deed PDFs")]
#[command(version)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every PDF in a directory as one batch.
    Run {
        /// Directory containing input PDFs.
        input_dir: PathBuf,
        /// Human-readable name for this batch (defaults to the directory name).
        #[arg(long)]
        name: Option<String>,
    },
    /// Apply pending schema migrations and exit.
    Migrate,
}

/// Check if verbose mode is enabled, for logging setup that must happen
/// before argument parsing completes.
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref())?;

    let pool = AsyncSqlitePool::new(&config.database_url, 1);
    crate::repository::migrations::run_migrations(&config.database_url).await?;

    match cli.command {
        Commands::Migrate => {
            println!("{}", style("migrations applied").green());
            Ok(())
        }
        Commands::Run { input_dir, name } => run_batch_command(config, pool, input_dir, name).await,
    }
}

async fn run_batch_command(
    config: PipelineConfig,
    pool: AsyncSqlitePool,
    input_dir: PathBuf,
    name: Option<String>,
) -> anyhow::Result<()> {
    let batch_name = name.unwrap_or_else(|| {
        input_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("batch")
            .to_string()
    });
    let batch_id = format!("batch-{}", chrono::Utc::now().format("%Y%m%dT%H%M%S"));

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(&input_dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported_input(&path) {
            candidates.push(path);
        }
    }

    let document_store = DocumentStore::new(pool.clone());
    let (unique, duplicates) = check_batch(&candidates, &document_store).await?;
    for (path, existing) in &duplicates {
        tracing::info!(
            path = %path.display(),
            existing_document_id = %existing.document_id,
            "skipping duplicate input"
        );
    }

    let tasks: Vec<InputTask> = unique
        .into_iter()
        .map(|source_path| InputTask {
            document_id: derive_document_id(&source_path),
            batch_id: batch_id.clone(),
            source_path,
        })
        .collect();

    if tasks.is_empty() {
        println!("{}", style("no new documents to process").yellow());
        return Ok(());
    }

    let collaborators = Collaborators {
        rasterizer: Arc::new(PdftoppmRasterizer::new(config.target_width)),
        text_extractor: Arc::new(CliTextExtractor::new()),
        fee_extractor: Arc::new(HeuristicFeeExtractor::new()),
        table_detector: Arc::new(BottomRegionTableDetector::new()),
        vision_model: Arc::new(GeminiVisionModel::new(
            config.vision_endpoint.clone(),
            config.vision_api_key.clone(),
        )),
        language_model: Arc::new(HttpLanguageModel::new(
            config.llm_endpoint.clone(),
            config.llm_model.clone(),
            config.llm_timeout_secs,
        )),
        transliterator: Arc::new(AsciiFoldTransliterator::new()),
        persistor: Arc::new(Persistor::new(pool.clone())),
        batch_store: Arc::new(BatchStore::new(pool.clone())),
        file_mover: Arc::new(FilesystemMover::new(input_dir.clone())),
        notifier: Arc::new(TracingNotifier),
    };

    let pipeline = Arc::new(Pipeline::new(config, collaborators));

    let stop_handle = pipeline.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("stop requested, finishing in-flight documents");
            stop_handle.stop();
        }
    });

    let progress = ProgressBar::new(tasks.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let progress_handle = progress.clone();
    let poll_pipeline = pipeline.clone();
    let poller = tokio::spawn(async move {
        loop {
            let snap = poll_pipeline.stats();
            progress_handle.set_position(snap.processed as u64);
            progress_handle.set_message(format!(
                "ok={} failed={} stopped={}",
                snap.successful, snap.failed, snap.stopped
            ));
            if !snap.is_running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    });

    let summary = pipeline.run_batch(&batch_id, &batch_name, tasks).await;
    poller.abort();
    progress.finish_and_clear();

    println!(
        "{} total={} successful={} failed={} stopped={}",
        style("batch complete").bold(),
        summary.total,
        summary.successful,
        summary.failed,
        summary.stopped
    );

    Ok(())
}
