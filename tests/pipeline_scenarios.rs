//! End-to-end coordinator tests, driving `Pipeline::run_batch` through
//! the `Collaborators` injection seam with scripted collaborators.
//! Covers the scenario table: happy path, vision fallback, all fee
//! sources absent, stop mid-batch, Stage-1 `InsufficientText`, and
//! handoff-channel backpressure.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use deedpipe::models::{ExtractedRecord, PageImage};
use deedpipe::pipeline::Pipeline;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn s1_happy_path_persists_and_moves_to_processed() {
    let input_dir = tempfile::tempdir().unwrap();
    let (_db_dir, pool) = common::make_pool().await;

    let task = common::make_task(input_dir.path(), "batch-1", "doc-a", b"pdf bytes for doc a");

    let mut texts = HashMap::new();
    texts.insert(
        task.source_path.clone(),
        vec![(1, format!("Registration Fee: Rs. 1500\n{}", "filler text ".repeat(20)))],
    );

    let collaborators = common::build_collaborators(
        input_dir.path().to_path_buf(),
        pool.clone(),
        Arc::new(common::ScriptedRasterizer::new(HashMap::new())),
        Arc::new(common::ScriptedTextExtractor::new(texts)),
        Arc::new(common::ScriptedTableDetector::new(None)),
        Arc::new(common::ScriptedVisionModel::new(None)),
        Arc::new(common::ScriptedLanguageModel::new(ExtractedRecord::default())),
    );

    let pipeline = Pipeline::new(common::base_config(2, 1, 1), collaborators);
    let summary = pipeline.run_batch("batch-1", "Batch One", vec![task.clone()]).await;

    assert_eq!(summary.total, 1);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.stopped, 0);

    let fee = common::read_registration_fee(&pool, "doc-a").await;
    assert_eq!(fee.as_deref(), Some("1500"));
    assert!(input_dir.path().join("processed").join("doc-a.pdf").exists());
    assert!(!task.source_path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn s2_vision_fallback_resolves_fee_when_text_heuristic_finds_nothing() {
    let input_dir = tempfile::tempdir().unwrap();
    let (_db_dir, pool) = common::make_pool().await;

    let task = common::make_task(input_dir.path(), "batch-2", "doc-b", b"pdf bytes for doc b");

    let mut texts = HashMap::new();
    texts.insert(
        task.source_path.clone(),
        vec![(1, "no fee amounts mentioned on this page at all ".repeat(6))],
    );

    let mut pages = HashMap::new();
    pages.insert(
        task.source_path.clone(),
        vec![PageImage {
            page_number: 1,
            png_bytes: vec![0u8; 16],
            width: 100,
            height: 100,
        }],
    );

    let crop = PageImage {
        page_number: 1,
        png_bytes: vec![0u8; 4],
        width: 10,
        height: 10,
    };

    let collaborators = common::build_collaborators(
        input_dir.path().to_path_buf(),
        pool.clone(),
        Arc::new(common::ScriptedRasterizer::new(pages)),
        Arc::new(common::ScriptedTextExtractor::new(texts)),
        Arc::new(common::ScriptedTableDetector::new(Some(crop))),
        Arc::new(common::ScriptedVisionModel::new(Some(2500.0))),
        Arc::new(common::ScriptedLanguageModel::new(ExtractedRecord::default())),
    );

    let pipeline = Pipeline::new(common::base_config(2, 1, 1), collaborators);
    let summary = pipeline.run_batch("batch-2", "Batch Two", vec![task]).await;

    assert_eq!(summary.successful, 1);
    let fee = common::read_registration_fee(&pool, "doc-b").await;
    assert_eq!(fee.as_deref(), Some("2500"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn s3_all_fee_sources_absent_persists_without_a_fee() {
    let input_dir = tempfile::tempdir().unwrap();
    let (_db_dir, pool) = common::make_pool().await;

    let task = common::make_task(input_dir.path(), "batch-3", "doc-c", b"pdf bytes for doc c");

    let mut texts = HashMap::new();
    texts.insert(
        task.source_path.clone(),
        vec![(1, "plain body text with no monetary figures ".repeat(6))],
    );

    let collaborators = common::build_collaborators(
        input_dir.path().to_path_buf(),
        pool.clone(),
        Arc::new(common::ScriptedRasterizer::new(HashMap::new())),
        Arc::new(common::ScriptedTextExtractor::new(texts)),
        Arc::new(common::ScriptedTableDetector::new(None)),
        Arc::new(common::ScriptedVisionModel::new(None)),
        Arc::new(common::ScriptedLanguageModel::new(ExtractedRecord::default())),
    );

    let pipeline = Pipeline::new(common::base_config(2, 1, 1), collaborators);
    let summary = pipeline.run_batch("batch-3", "Batch Three", vec![task]).await;

    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 0);
    let fee = common::read_registration_fee(&pool, "doc-c").await;
    assert_eq!(fee, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn s4_stop_mid_batch_marks_remaining_documents_stopped() {
    let input_dir = tempfile::tempdir().unwrap();
    let (_db_dir, pool) = common::make_pool().await;

    let tasks: Vec<_> = (0..5)
        .map(|i| {
            common::make_task(
                input_dir.path(),
                "batch-4",
                &format!("doc-{i}"),
                format!("pdf bytes {i}").as_bytes(),
            )
        })
        .collect();

    let language_model = common::StopMidBatchLanguageModel::new();

    let collaborators = common::build_collaborators(
        input_dir.path().to_path_buf(),
        pool,
        Arc::new(common::ScriptedRasterizer::new(HashMap::new())),
        Arc::new(common::ScriptedTextExtractor::new(HashMap::new())),
        Arc::new(common::ScriptedTableDetector::new(None)),
        Arc::new(common::ScriptedVisionModel::new(None)),
        language_model.clone(),
    );

    let pipeline = Arc::new(Pipeline::new(common::base_config(1, 1, 1), collaborators));
    language_model.attach(pipeline.clone());

    let summary = pipeline.run_batch("batch-4", "Batch Four", tasks).await;

    assert_eq!(summary.total, 5);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.stopped, 4);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.processed, summary.successful + summary.failed + summary.stopped);
    assert!(!pipeline.stats().is_running);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn s5_insufficient_text_fails_in_stage1_without_reaching_stage2() {
    let input_dir = tempfile::tempdir().unwrap();
    let (_db_dir, pool) = common::make_pool().await;

    let task = common::make_task(input_dir.path(), "batch-5", "doc-short", b"pdf bytes for short doc");

    let mut texts = HashMap::new();
    texts.insert(task.source_path.clone(), vec![(1, "short".to_string())]);

    let collaborators = common::build_collaborators(
        input_dir.path().to_path_buf(),
        pool.clone(),
        Arc::new(common::ScriptedRasterizer::new(HashMap::new())),
        Arc::new(common::ScriptedTextExtractor::new(texts)),
        Arc::new(common::ScriptedTableDetector::new(None)),
        Arc::new(common::ScriptedVisionModel::new(None)),
        Arc::new(common::ScriptedLanguageModel::new(ExtractedRecord::default())),
    );

    let pipeline = Pipeline::new(common::base_config(2, 1, 1), collaborators);
    let summary = pipeline.run_batch("batch-5", "Batch Five", vec![task]).await;

    assert_eq!(summary.total, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.successful, 0);
    assert!(input_dir.path().join("failed").join("doc-short.pdf").exists());

    let fee = common::read_registration_fee(&pool, "doc-short").await;
    assert_eq!(fee, None, "a document that never reached Stage-2 must never be persisted");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn s6_bounded_handoff_channel_limits_in_flight_buffering() {
    let input_dir = tempfile::tempdir().unwrap();
    let (_db_dir, pool) = common::make_pool().await;

    let tasks: Vec<_> = (0..6)
        .map(|i| {
            common::make_task(
                input_dir.path(),
                "batch-6",
                &format!("doc-{i}"),
                format!("pdf bytes {i}").as_bytes(),
            )
        })
        .collect();

    let collaborators = common::build_collaborators(
        input_dir.path().to_path_buf(),
        pool,
        Arc::new(common::ScriptedRasterizer::new(HashMap::new())),
        Arc::new(common::ScriptedTextExtractor::new(HashMap::new())),
        Arc::new(common::ScriptedTableDetector::new(None)),
        Arc::new(common::ScriptedVisionModel::new(None)),
        Arc::new(common::SlowLanguageModel::new(40)),
    );

    let handoff_capacity = 1;
    let pipeline = Arc::new(Pipeline::new(common::base_config(handoff_capacity, 3, 1), collaborators));

    let handle = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.run_batch("batch-6", "Batch Six", tasks).await })
    };

    let mut observed_max = 0usize;
    for _ in 0..20 {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        observed_max = observed_max.max(pipeline.stats().in_buffer);
    }

    let summary = handle.await.unwrap();
    assert_eq!(summary.total, 6);
    assert_eq!(summary.successful, 6);
    assert!(
        observed_max <= handoff_capacity,
        "handoff buffer exceeded configured capacity {handoff_capacity}: observed {observed_max}"
    );
}
