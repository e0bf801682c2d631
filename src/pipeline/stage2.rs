//! Stage-2 worker (C10): structured extraction, fee arbitration,
//! validation/normalization, persistence, and file routing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::duplicate_detector::hash_file;
use crate::errors::PipelineError;
use crate::file_mover::Area;
use crate::models::{DocStatus, Stage1Output};
use crate::raster::Rasterizer;
use crate::validator;
use crate::vision::find_first_table;

use super::collaborators::Collaborators;
use super::stats::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Successful,
    Failed,
    Stopped,
}

fn stopped(running: &AtomicBool) -> bool {
    !running.load(Ordering::SeqCst)
}

/// Run Stage-2 for one document's Stage-1 output, returning the terminal
/// outcome used to update the coordinator's statistics.
pub async fn run(
    stage1: Stage1Output,
    collaborators: &Collaborators,
    config: &PipelineConfig,
    rasterizer: &dyn Rasterizer,
    stats: &Arc<Stats>,
    running: &Arc<AtomicBool>,
) -> Outcome {
    stats.enter_stage2();
    let outcome = run_inner(stage1, collaborators, config, rasterizer, running).await;
    stats.exit_stage2();
    outcome
}

async fn run_inner(
    stage1: Stage1Output,
    collaborators: &Collaborators,
    config: &PipelineConfig,
    rasterizer: &dyn Rasterizer,
    running: &Arc<AtomicBool>,
) -> Outcome {
    if stage1.status == DocStatus::Stopped {
        return Outcome::Stopped;
    }
    if stage1.status == DocStatus::Failed {
        fail(collaborators, &stage1);
        return Outcome::Failed;
    }
    if stopped(running) {
        return Outcome::Stopped;
    }

    let extracted = match collaborators
        .language_model
        .extract(&stage1.full_text, &stage1.page_images)
        .await
    {
        Ok(record) => record,
        Err(e) => {
            let error = PipelineError::from(e);
            tracing::warn!(document_id = %stage1.document_id, category = error.category(), error = %error, "structured extraction failed");
            fail(collaborators, &stage1);
            return Outcome::Failed;
        }
    };

    if stopped(running) {
        return Outcome::Stopped;
    }

    // Priority 1 (C4) already resolved in Stage-1. Only fall through to
    // the vision fallback (C5) when the text heuristic found nothing.
    let table_result = if stage1.fee_from_text.is_none() {
        let pages = if stage1.page_images.is_empty() {
            rasterizer
                .to_pages(&stage1.source_path, config.max_pages)
                .unwrap_or_default()
        } else {
            stage1.page_images.clone()
        };

        find_first_table(collaborators.table_detector.as_ref(), &pages, config.table_confidence)
    } else {
        None
    };

    let vision_fee = if let Some(crop) = table_result.as_ref() {
        match collaborators.vision_model.extract_fee(crop).await {
            Ok(fee) => fee,
            Err(e) => {
                tracing::warn!(document_id = %stage1.document_id, error = %e, "vision fee extraction failed");
                None
            }
        }
    } else {
        None
    };

    let table_detection = table_result.as_ref().map(|_| crate::vision::TableDetectionResult {
        table_found: true,
        registration_fee: vision_fee,
    });

    let llm_fee = extracted
        .property
        .registration_fee
        .as_deref()
        .and_then(validator::clean_numeric);

    let (resolved_fee, _source) =
        validator::choose_registration_fee(stage1.fee_from_text, table_detection.as_ref(), llm_fee);

    if stopped(running) {
        return Outcome::Stopped;
    }

    let normalized = validator::normalize(extracted, collaborators.transliterator.as_ref(), resolved_fee);

    let fingerprint = match hash_file(&stage1.source_path) {
        Ok(f) => f,
        Err(e) => {
            let error = PipelineError::Unknown(e.to_string());
            tracing::warn!(document_id = %stage1.document_id, category = error.category(), error = %error, "hashing failed");
            fail(collaborators, &stage1);
            return Outcome::Failed;
        }
    };

    let persisted = collaborators
        .persistor
        .save(
            &stage1.document_id,
            &stage1.batch_id,
            &fingerprint.sha256,
            Some(&fingerprint.blake3),
            &normalized,
        )
        .await;

    match persisted {
        Ok(()) => {
            if let Err(e) = collaborators.file_mover.move_to(Area::Processed, &stage1.source_path) {
                tracing::warn!(document_id = %stage1.document_id, error = %e, "failed to move processed file");
            }
            Outcome::Successful
        }
        Err(e) => {
            let error = PipelineError::from(e);
            tracing::warn!(document_id = %stage1.document_id, category = error.category(), error = %error, "persistence failed");
            fail(collaborators, &stage1);
            Outcome::Failed
        }
    }
}

fn fail(collaborators: &Collaborators, stage1: &Stage1Output) {
    if let Err(e) = collaborators.file_mover.move_to(Area::Failed, &stage1.source_path) {
        tracing::warn!(document_id = %stage1.document_id, error = %e, "failed to move failed file");
    }
}
