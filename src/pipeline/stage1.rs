//! Stage-1 worker (C9): rasterize, extract text, and heuristically
//! locate a registration fee, stopping early at any checkpoint once
//! cancellation has been requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::fee_extractor::FeeExtractor;
use crate::models::{DocStatus, InputTask, PageImage, Stage1Output};
use crate::raster::Rasterizer;
use crate::text_extract::{join_pages, TextExtractor};

use super::stats::Stats;

const MIN_TEXT_CHARS: usize = 100;

fn stopped(running: &AtomicBool) -> bool {
    !running.load(Ordering::SeqCst)
}

/// Run Stage-1 for a single document. Never panics: every failure mode
/// is captured in the returned [`Stage1Output`]'s `status`/`error`.
pub fn run(
    task: InputTask,
    rasterizer: &dyn Rasterizer,
    text_extractor: &dyn TextExtractor,
    fee_extractor: &dyn FeeExtractor,
    config: &PipelineConfig,
    stats: &Arc<Stats>,
    running: &Arc<AtomicBool>,
) -> Stage1Output {
    stats.enter_stage1(&task.document_id);
    let output = run_inner(&task, rasterizer, text_extractor, fee_extractor, config, running);
    stats.exit_stage1();
    output
}

fn run_inner(
    task: &InputTask,
    rasterizer: &dyn Rasterizer,
    text_extractor: &dyn TextExtractor,
    fee_extractor: &dyn FeeExtractor,
    config: &PipelineConfig,
    running: &Arc<AtomicBool>,
) -> Stage1Output {
    let stopped_output = |error: Option<String>, page_images: Vec<PageImage>, full_text: String| Stage1Output {
        document_id: task.document_id.clone(),
        batch_id: task.batch_id.clone(),
        source_path: task.source_path.clone(),
        page_images,
        full_text,
        fee_from_text: None,
        status: DocStatus::Stopped,
        error,
    };

    if stopped(running) {
        return stopped_output(None, Vec::new(), String::new());
    }

    let page_images = match rasterizer.to_pages(&task.source_path, config.max_pages) {
        Ok(pages) => pages,
        Err(e) => {
            let error = PipelineError::from(e);
            tracing::warn!(document_id = %task.document_id, category = error.category(), error = %error, "rasterization failed");
            return Stage1Output {
                document_id: task.document_id.clone(),
                batch_id: task.batch_id.clone(),
                source_path: task.source_path.clone(),
                page_images: Vec::new(),
                full_text: String::new(),
                fee_from_text: None,
                status: DocStatus::Failed,
                error: Some(error.to_string()),
            };
        }
    };

    if stopped(running) {
        return stopped_output(None, page_images, String::new());
    }

    let pages = match text_extractor.per_page(
        &task.source_path,
        &page_images,
        config.mode,
        &config.ocr_language,
        config.ocr_page_concurrency,
    ) {
        Ok(pages) => pages,
        Err(e) => {
            let error = PipelineError::from(e);
            tracing::warn!(document_id = %task.document_id, category = error.category(), error = %error, "text extraction failed");
            return Stage1Output {
                document_id: task.document_id.clone(),
                batch_id: task.batch_id.clone(),
                source_path: task.source_path.clone(),
                page_images,
                full_text: String::new(),
                fee_from_text: None,
                status: DocStatus::Failed,
                error: Some(error.to_string()),
            };
        }
    };
    let full_text = join_pages(&pages);

    if stopped(running) {
        return stopped_output(None, page_images, full_text);
    }

    if full_text.trim().len() < MIN_TEXT_CHARS {
        let error = PipelineError::InsufficientText {
            chars: full_text.trim().len(),
            min: MIN_TEXT_CHARS,
        };
        tracing::warn!(document_id = %task.document_id, category = error.category(), error = %error, "stage-1 rejected document");
        return Stage1Output {
            document_id: task.document_id.clone(),
            batch_id: task.batch_id.clone(),
            source_path: task.source_path.clone(),
            page_images,
            full_text: full_text.clone(),
            fee_from_text: None,
            status: DocStatus::Failed,
            error: Some(error.to_string()),
        };
    }

    let fee_from_text = fee_extractor.from_text(&full_text, config.min_fee, config.max_misc_fee);

    Stage1Output {
        document_id: task.document_id.clone(),
        batch_id: task.batch_id.clone(),
        source_path: task.source_path.clone(),
        page_images,
        full_text,
        fee_from_text,
        status: DocStatus::Ok,
        error: None,
    }
}
