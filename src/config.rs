//! Layered configuration for the pipeline: compiled-in defaults, an
//! optional TOML file, then environment-variable overrides for secrets
//! and deployment-specific values.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Text-extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Pull the embedded text layer directly (fast, no OCR).
    Native,
    /// Rasterize and run OCR over every page.
    Ocr,
}

impl Default for ExtractionMode {
    fn default() -> Self {
        ExtractionMode::Ocr
    }
}

/// Immutable tuning knobs for one `runBatch` invocation.
///
/// Assembled once via [`PipelineConfig::load`] and shared by reference
/// across every worker; never mutated mid-batch (see the coordinator's
/// `update` contract for how a new value takes effect between batches).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_ocr_workers")]
    pub ocr_workers: usize,
    #[serde(default = "default_llm_workers")]
    pub llm_workers: usize,
    #[serde(default = "default_handoff_capacity")]
    pub handoff_capacity: usize,
    #[serde(default = "default_ocr_page_concurrency")]
    pub ocr_page_concurrency: usize,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_target_width")]
    pub target_width: u32,
    #[serde(default = "default_min_fee")]
    pub min_fee: f64,
    #[serde(default = "default_max_misc_fee")]
    pub max_misc_fee: f64,
    #[serde(default = "default_table_confidence")]
    pub table_confidence: f32,
    #[serde(default)]
    pub mode: ExtractionMode,
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,

    #[serde(default = "default_llm_endpoint")]
    pub llm_endpoint: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default)]
    pub llm_api_key: Option<String>,

    #[serde(default = "default_vision_endpoint")]
    pub vision_endpoint: String,
    #[serde(default)]
    pub vision_api_key: Option<String>,

    #[serde(default = "default_database_url")]
    pub database_url: String,
}

fn default_ocr_workers() -> usize {
    2
}
fn default_llm_workers() -> usize {
    8
}
fn default_handoff_capacity() -> usize {
    1
}
fn default_ocr_page_concurrency() -> usize {
    1
}
fn default_max_pages() -> u32 {
    30
}
fn default_target_width() -> u32 {
    2000
}
fn default_min_fee() -> f64 {
    100.0
}
fn default_max_misc_fee() -> f64 {
    3000.0
}
fn default_table_confidence() -> f32 {
    0.86
}
fn default_llm_timeout_secs() -> u64 {
    300
}
fn default_ocr_language() -> String {
    "eng".to_string()
}
fn default_llm_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_llm_model() -> String {
    "llama3.2:instruct".to_string()
}
fn default_vision_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_database_url() -> String {
    "deedpipe.sqlite".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ocr_workers: default_ocr_workers(),
            llm_workers: default_llm_workers(),
            handoff_capacity: default_handoff_capacity(),
            ocr_page_concurrency: default_ocr_page_concurrency(),
            max_pages: default_max_pages(),
            target_width: default_target_width(),
            min_fee: default_min_fee(),
            max_misc_fee: default_max_misc_fee(),
            table_confidence: default_table_confidence(),
            mode: ExtractionMode::default(),
            llm_timeout_secs: default_llm_timeout_secs(),
            ocr_language: default_ocr_language(),
            llm_endpoint: default_llm_endpoint(),
            llm_model: default_llm_model(),
            llm_api_key: None,
            vision_endpoint: default_vision_endpoint(),
            vision_api_key: None,
            database_url: default_database_url(),
        }
    }
}

/// Documented bounds (§4.1/§6) enforced by [`PipelineConfig::load`].
const OCR_WORKERS_RANGE: (usize, usize) = (1, 20);
const LLM_WORKERS_RANGE: (usize, usize) = (1, 20);
const HANDOFF_CAPACITY_RANGE: (usize, usize) = (1, 10);
const OCR_PAGE_CONCURRENCY_RANGE: (usize, usize) = (1, 8);

impl PipelineConfig {
    /// Load configuration: defaults, then an optional TOML file at
    /// `path` (if it exists), then environment overrides, then clamp
    /// every bounded field to its documented range.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(p)?;
                toml::from_str(&text)?
            }
            _ => PipelineConfig::default(),
        };

        config.apply_env_overrides();
        config.clamp_bounds();
        Ok(config)
    }

    /// Clamp `ocr_workers`, `llm_workers`, `handoff_capacity`, and
    /// `ocr_page_concurrency` into their documented ranges, so a
    /// misconfigured TOML (or env override) can't spawn an unbounded
    /// number of workers or buffer an unbounded number of documents.
    fn clamp_bounds(&mut self) {
        self.ocr_workers = self.ocr_workers.clamp(OCR_WORKERS_RANGE.0, OCR_WORKERS_RANGE.1);
        self.llm_workers = self.llm_workers.clamp(LLM_WORKERS_RANGE.0, LLM_WORKERS_RANGE.1);
        self.handoff_capacity = self
            .handoff_capacity
            .clamp(HANDOFF_CAPACITY_RANGE.0, HANDOFF_CAPACITY_RANGE.1);
        self.ocr_page_concurrency = self
            .ocr_page_concurrency
            .clamp(OCR_PAGE_CONCURRENCY_RANGE.0, OCR_PAGE_CONCURRENCY_RANGE.1);
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(key) = std::env::var("DEEDPIPE_LLM_API_KEY") {
            self.llm_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("DEEDPIPE_VISION_API_KEY") {
            self.vision_api_key = Some(key);
        }
        if let Ok(endpoint) = std::env::var("DEEDPIPE_LLM_ENDPOINT") {
            self.llm_endpoint = endpoint;
        }
    }
}
