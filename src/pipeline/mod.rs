//! Pipeline Coordinator (C11): drives the two worker pools, the bounded
//! hand-off channel between them, and the batch lifecycle.

pub mod collaborators;
pub mod stage1;
pub mod stage2;
pub mod stats;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::PipelineConfig;
use crate::models::{BatchSummary, InputTask};

pub use collaborators::{Collaborators, CompletionNotification, NotificationSeverity, Notifier, TracingNotifier};
pub use stats::{Snapshot, Stats};

/// Owns one batch's worker pools and shared state. Construct one per
/// `runBatch` call; `stop()` is safe to call concurrently from another
/// task (e.g. a Ctrl+C handler).
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    collaborators: Arc<Collaborators>,
    running: Arc<AtomicBool>,
    stats: Arc<Stats>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Self {
        let stats = Stats::new(0, config.ocr_workers, config.llm_workers);
        Self {
            config: Arc::new(config),
            collaborators: Arc::new(collaborators),
            running: Arc::new(AtomicBool::new(true)),
            stats: Arc::new(stats),
        }
    }

    /// Signal cooperative cancellation. Workers observe this at the
    /// checkpoints documented in Stage-1/Stage-2 and stop as soon as
    /// they next check, not mid-operation.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stats.set_running(false);
    }

    pub fn stats(&self) -> Snapshot {
        self.stats.snapshot()
    }

    /// Run one batch to completion: rasterize/extract every task through
    /// Stage-1, hand results to Stage-2 over a bounded channel providing
    /// backpressure, then persist the batch's final counts and emit one
    /// completion notification.
    pub async fn run_batch(&self, batch_id: &str, batch_name: &str, tasks: Vec<InputTask>) -> BatchSummary {
        let total = tasks.len();
        self.stats.set_total(total);
        self.running.store(true, Ordering::SeqCst);
        self.stats.set_running(true);

        if let Err(e) = self.collaborators.batch_store.create(batch_id, batch_name, total).await {
            tracing::warn!(batch_id, error = %e, "failed to record batch session");
        }
        if let Err(e) = self.collaborators.batch_store.mark_processing(batch_id).await {
            tracing::warn!(batch_id, error = %e, "failed to mark batch processing");
        }

        let (tx, rx) = mpsc::channel(self.config.handoff_capacity.max(1));

        let stage1_handle = self.spawn_stage1_pool(tasks, tx);
        let stage2_handle = self.spawn_stage2_pool(rx);

        stage1_handle.await.ok();
        let (successful, failed, stopped) = stage2_handle.await.unwrap_or((0, 0, 0));

        let processed = successful + failed + stopped;
        if let Err(e) = self
            .collaborators
            .batch_store
            .mark_completed(batch_id, processed, failed)
            .await
        {
            tracing::warn!(batch_id, error = %e, "failed to mark batch completed");
        }

        let summary = BatchSummary {
            batch_id: batch_id.to_string(),
            total,
            processed,
            successful,
            failed,
            stopped,
        };

        let severity = match summary.severity() {
            crate::models::NotificationSeverity::Success => NotificationSeverity::Success,
            crate::models::NotificationSeverity::Warning => NotificationSeverity::Warning,
            crate::models::NotificationSeverity::Error => NotificationSeverity::Error,
        };

        self.collaborators
            .notifier
            .emit(CompletionNotification {
                batch_id: summary.batch_id.clone(),
                batch_name: batch_name.to_string(),
                total: summary.total,
                successful: summary.successful,
                failed: summary.failed,
                severity,
            })
            .await;

        self.stats.set_running(false);
        summary
    }

    fn spawn_stage1_pool(
        &self,
        tasks: Vec<InputTask>,
        tx: mpsc::Sender<crate::models::Stage1Output>,
    ) -> tokio::task::JoinHandle<()> {
        let worker_count = self.config.ocr_workers.max(1);
        let queue = Arc::new(tokio::sync::Mutex::new(tasks.into_iter()));
        let config = self.config.clone();
        let collaborators = self.collaborators.clone();
        let stats = self.stats.clone();
        let running = self.running.clone();

        tokio::spawn(async move {
            let mut workers = Vec::with_capacity(worker_count);
            for _ in 0..worker_count {
                let queue = queue.clone();
                let config = config.clone();
                let collaborators = collaborators.clone();
                let stats = stats.clone();
                let running = running.clone();
                let tx = tx.clone();

                workers.push(tokio::spawn(async move {
                    loop {
                        let task = {
                            let mut guard = queue.lock().await;
                            guard.next()
                        };
                        let Some(task) = task else { break };

                        let config = config.clone();
                        let rasterizer = collaborators.rasterizer.clone();
                        let text_extractor = collaborators.text_extractor.clone();
                        let fee_extractor = collaborators.fee_extractor.clone();
                        let stats_for_blocking = stats.clone();
                        let running_for_blocking = running.clone();

                        let output = tokio::task::spawn_blocking(move || {
                            stage1::run(
                                task,
                                rasterizer.as_ref(),
                                text_extractor.as_ref(),
                                fee_extractor.as_ref(),
                                &config,
                                &stats_for_blocking,
                                &running_for_blocking,
                            )
                        })
                        .await
                        .expect("stage-1 worker task panicked");

                        if tx.send(output).await.is_err() {
                            break;
                        }
                    }
                }));
            }
            for worker in workers {
                worker.await.ok();
            }
        })
    }

    fn spawn_stage2_pool(
        &self,
        rx: mpsc::Receiver<crate::models::Stage1Output>,
    ) -> tokio::task::JoinHandle<(usize, usize, usize)> {
        let worker_count = self.config.llm_workers.max(1);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let config = self.config.clone();
        let collaborators = self.collaborators.clone();
        let stats = self.stats.clone();
        let running = self.running.clone();

        tokio::spawn(async move {
            let successful = Arc::new(std::sync::atomic::AtomicUsize::new(0));
            let failed = Arc::new(std::sync::atomic::AtomicUsize::new(0));
            let stopped = Arc::new(std::sync::atomic::AtomicUsize::new(0));

            let mut workers = Vec::with_capacity(worker_count);
            for _ in 0..worker_count {
                let rx = rx.clone();
                let config = config.clone();
                let collaborators = collaborators.clone();
                let stats = stats.clone();
                let running = running.clone();
                let successful = successful.clone();
                let failed = failed.clone();
                let stopped = stopped.clone();

                workers.push(tokio::spawn(async move {
                    loop {
                        let stage1 = {
                            let mut guard = rx.lock().await;
                            stats.set_in_buffer(guard.len());
                            guard.recv().await
                        };
                        let Some(stage1) = stage1 else { break };

                        let rasterizer = collaborators.rasterizer.clone();
                        let outcome = stage2::run(
                            stage1,
                            &collaborators,
                            &config,
                            rasterizer.as_ref(),
                            &stats,
                            &running,
                        )
                        .await;

                        match outcome {
                            stage2::Outcome::Successful => {
                                stats.record_successful();
                                successful.fetch_add(1, Ordering::SeqCst);
                            }
                            stage2::Outcome::Failed => {
                                stats.record_failed();
                                failed.fetch_add(1, Ordering::SeqCst);
                            }
                            stage2::Outcome::Stopped => {
                                stats.record_stopped();
                                stopped.fetch_add(1, Ordering::SeqCst);
                            }
                        }
                    }
                }));
            }
            for worker in workers {
                worker.await.ok();
            }

            (
                successful.load(Ordering::SeqCst),
                failed.load(Ordering::SeqCst),
                stopped.load(Ordering::SeqCst),
            )
        })
    }
}
