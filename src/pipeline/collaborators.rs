//! Bundles the abstract collaborator contracts (§6) that the
//! coordinator and its workers depend on, injected at construction time
//! rather than reached for as globals — tests substitute stubs for all
//! of these.

use std::sync::Arc;

use async_trait::async_trait;

use crate::fee_extractor::FeeExtractor;
use crate::file_mover::FileMover;
use crate::llm::LanguageModel;
use crate::raster::Rasterizer;
use crate::repository::{BatchStore, Persistor};
use crate::text_extract::TextExtractor;
use crate::transliteration::Transliterator;
use crate::vision::{TableDetector, VisionModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationSeverity {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CompletionNotification {
    pub batch_id: String,
    pub batch_name: String,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub severity: NotificationSeverity,
}

/// Emits the single batch-completion notification (§4.1 step 6).
/// Implementations decide where that goes (log line, webhook, queue).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn emit(&self, event: CompletionNotification);
}

/// Logs the notification at the level matching its severity. The
/// default, always-available implementation.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn emit(&self, event: CompletionNotification) {
        match event.severity {
            NotificationSeverity::Success => tracing::info!(
                batch_id = %event.batch_id,
                total = event.total,
                successful = event.successful,
                failed = event.failed,
                "batch completed"
            ),
            NotificationSeverity::Warning => tracing::warn!(
                batch_id = %event.batch_id,
                total = event.total,
                successful = event.successful,
                failed = event.failed,
                "batch completed with failures"
            ),
            NotificationSeverity::Error => tracing::error!(
                batch_id = %event.batch_id,
                total = event.total,
                successful = event.successful,
                failed = event.failed,
                "batch completed, all documents failed"
            ),
        }
    }
}

/// Everything both worker pools need, shared by `Arc` across tasks.
pub struct Collaborators {
    pub rasterizer: Arc<dyn Rasterizer>,
    pub text_extractor: Arc<dyn TextExtractor>,
    pub fee_extractor: Arc<dyn FeeExtractor>,
    pub table_detector: Arc<dyn TableDetector>,
    pub vision_model: Arc<dyn VisionModel>,
    pub language_model: Arc<dyn LanguageModel>,
    pub transliterator: Arc<dyn Transliterator>,
    pub persistor: Arc<Persistor>,
    pub batch_store: Arc<BatchStore>,
    pub file_mover: Arc<dyn FileMover>,
    pub notifier: Arc<dyn Notifier>,
}
