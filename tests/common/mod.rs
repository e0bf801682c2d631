//! Shared test fixtures for the end-to-end pipeline scenarios: scripted
//! stand-ins for the collaborators that would otherwise shell out or
//! call a network API, plus a real temporary SQLite-backed persistence
//! layer so the coordinator's actual save/query path is exercised.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use deedpipe::config::{ExtractionMode, PipelineConfig};
use deedpipe::fee_extractor::HeuristicFeeExtractor;
use deedpipe::file_mover::FilesystemMover;
use deedpipe::llm::{LanguageModel, LlmError};
use deedpipe::models::{ExtractedRecord, InputTask, PageImage};
use deedpipe::pipeline::{Collaborators, Pipeline, TracingNotifier};
use deedpipe::raster::{RasterError, Rasterizer};
use deedpipe::repository::{AsyncSqlitePool, BatchStore, Persistor};
use deedpipe::schema::property;
use deedpipe::text_extract::{ExtractError, TextExtractor};
use deedpipe::transliteration::AsciiFoldTransliterator;
use deedpipe::vision::{TableDetector, VisionError, VisionModel};

/// Writes `content` to `<dir>/<document_id>.pdf` and returns the task
/// pointing at it. Stage-2 hashes this file directly off disk, so it
/// must exist for any document expected to reach Stage-2.
pub fn make_task(dir: &Path, batch_id: &str, document_id: &str, content: &[u8]) -> InputTask {
    let path = dir.join(format!("{document_id}.pdf"));
    std::fs::write(&path, content).unwrap();
    InputTask {
        document_id: document_id.to_string(),
        batch_id: batch_id.to_string(),
        source_path: path,
    }
}

pub fn base_config(handoff_capacity: usize, ocr_workers: usize, llm_workers: usize) -> PipelineConfig {
    PipelineConfig {
        ocr_workers,
        llm_workers,
        handoff_capacity,
        mode: ExtractionMode::Native,
        ..PipelineConfig::default()
    }
}

/// Stands up a fresh, migrated SQLite database in a new temp directory.
/// The `TempDir` must stay alive for as long as the pool is used.
pub async fn make_pool() -> (tempfile::TempDir, AsyncSqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.sqlite");
    let url = db_path.display().to_string();
    deedpipe::repository::migrations::run_migrations(&url).await.unwrap();
    let pool = AsyncSqlitePool::new(&url, 1);
    (dir, pool)
}

pub async fn read_registration_fee(pool: &AsyncSqlitePool, document_id: &str) -> Option<String> {
    let mut conn = pool.get().await.unwrap();
    property::table
        .filter(property::document_id.eq(document_id))
        .select(property::registration_fee)
        .first::<Option<String>>(&mut conn)
        .await
        .unwrap()
}

pub fn build_collaborators(
    mover_root: PathBuf,
    pool: AsyncSqlitePool,
    rasterizer: Arc<dyn Rasterizer>,
    text_extractor: Arc<dyn TextExtractor>,
    table_detector: Arc<dyn TableDetector>,
    vision_model: Arc<dyn VisionModel>,
    language_model: Arc<dyn LanguageModel>,
) -> Collaborators {
    Collaborators {
        rasterizer,
        text_extractor,
        fee_extractor: Arc::new(HeuristicFeeExtractor::new()),
        table_detector,
        vision_model,
        language_model,
        transliterator: Arc::new(AsciiFoldTransliterator::new()),
        persistor: Arc::new(Persistor::new(pool.clone())),
        batch_store: Arc::new(BatchStore::new(pool)),
        file_mover: Arc::new(FilesystemMover::new(mover_root)),
        notifier: Arc::new(TracingNotifier),
    }
}

/// Returns pre-scripted page images for known source paths, empty for
/// anything else (the native-mode default: no rasterization needed).
pub struct ScriptedRasterizer {
    pages: HashMap<PathBuf, Vec<PageImage>>,
}

impl ScriptedRasterizer {
    pub fn new(pages: HashMap<PathBuf, Vec<PageImage>>) -> Self {
        Self { pages }
    }
}

impl Rasterizer for ScriptedRasterizer {
    fn to_pages(&self, source: &Path, _max_pages: u32) -> Result<Vec<PageImage>, RasterError> {
        Ok(self.pages.get(source).cloned().unwrap_or_default())
    }
}

/// Returns pre-scripted per-page text for known source paths; anything
/// else gets generic filler long enough to clear the Stage-1 minimum.
pub struct ScriptedTextExtractor {
    pages: HashMap<PathBuf, Vec<(u32, String)>>,
}

impl ScriptedTextExtractor {
    pub fn new(pages: HashMap<PathBuf, Vec<(u32, String)>>) -> Self {
        Self { pages }
    }
}

impl TextExtractor for ScriptedTextExtractor {
    fn per_page(
        &self,
        source: &Path,
        _page_images: &[PageImage],
        _mode: ExtractionMode,
        _language: &str,
        _concurrency: usize,
    ) -> Result<Vec<(u32, String)>, ExtractError> {
        Ok(self
            .pages
            .get(source)
            .cloned()
            .unwrap_or_else(|| vec![(1, "no fee information in this filler text ".repeat(4))]))
    }
}

/// Always returns the same pre-scripted crop (or none), regardless of
/// the page handed in.
pub struct ScriptedTableDetector {
    crop: Option<PageImage>,
}

impl ScriptedTableDetector {
    pub fn new(crop: Option<PageImage>) -> Self {
        Self { crop }
    }
}

impl TableDetector for ScriptedTableDetector {
    fn detect(&self, _image: &PageImage, _min_confidence: f32) -> Option<PageImage> {
        self.crop.clone()
    }
}

pub struct ScriptedVisionModel {
    fee: Option<f64>,
}

impl ScriptedVisionModel {
    pub fn new(fee: Option<f64>) -> Self {
        Self { fee }
    }
}

#[async_trait]
impl VisionModel for ScriptedVisionModel {
    async fn extract_fee(&self, _crop: &PageImage) -> Result<Option<f64>, VisionError> {
        Ok(self.fee)
    }
}

/// Always returns the same pre-scripted record.
pub struct ScriptedLanguageModel {
    record: ExtractedRecord,
}

impl ScriptedLanguageModel {
    pub fn new(record: ExtractedRecord) -> Self {
        Self { record }
    }
}

#[async_trait]
impl LanguageModel for ScriptedLanguageModel {
    async fn extract(&self, _full_text: &str, _page_images: &[PageImage]) -> Result<ExtractedRecord, LlmError> {
        Ok(self.record.clone())
    }
}

/// Sleeps before returning a default record, to give a test a window in
/// which to observe in-flight buffering on the handoff channel.
pub struct SlowLanguageModel {
    delay: std::time::Duration,
}

impl SlowLanguageModel {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: std::time::Duration::from_millis(delay_ms),
        }
    }
}

#[async_trait]
impl LanguageModel for SlowLanguageModel {
    async fn extract(&self, _full_text: &str, _page_images: &[PageImage]) -> Result<ExtractedRecord, LlmError> {
        tokio::time::sleep(self.delay).await;
        Ok(ExtractedRecord::default())
    }
}

/// Lets the first `extract()` call succeed normally, then stops the
/// pipeline from inside the second call (so that document also ends up
/// `Stopped`), so every later document is pre-empted before `extract`
/// is even invoked. Attach the pipeline after construction, since the
/// pipeline can't exist before its own collaborators do.
pub struct StopMidBatchLanguageModel {
    calls: AtomicUsize,
    pipeline: OnceLock<Arc<Pipeline>>,
}

impl StopMidBatchLanguageModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            pipeline: OnceLock::new(),
        })
    }

    pub fn attach(&self, pipeline: Arc<Pipeline>) {
        self.pipeline.set(pipeline).ok();
    }
}

#[async_trait]
impl LanguageModel for StopMidBatchLanguageModel {
    async fn extract(&self, _full_text: &str, _page_images: &[PageImage]) -> Result<ExtractedRecord, LlmError> {
        let call_no = self.calls.fetch_add(1, Ordering::SeqCst);
        if call_no == 1 {
            if let Some(pipeline) = self.pipeline.get() {
                pipeline.stop();
            }
        }
        Ok(ExtractedRecord::default())
    }
}
