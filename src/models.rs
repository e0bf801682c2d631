//! Core data model shared across the pipeline: input tasks, the Stage-1
//! hand-off record, the structured extracted record, and batch sessions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One document submitted for processing.
#[derive(Debug, Clone)]
pub struct InputTask {
    pub document_id: String,
    pub batch_id: String,
    pub source_path: PathBuf,
}

/// A single rasterized page, normalized to the configured target width.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub page_number: u32,
    pub png_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Terminal status of a per-document stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocStatus {
    Ok,
    Stopped,
    Failed,
}

/// Hand-off record produced by Stage-1 and consumed by Stage-2.
///
/// `page_images` may be empty when the text extractor ran in native mode
/// and no images were needed; Stage-2 may re-rasterize in that case
/// (see the table detector's fallback behavior).
#[derive(Debug, Clone)]
pub struct Stage1Output {
    pub document_id: String,
    pub batch_id: String,
    pub source_path: PathBuf,
    pub page_images: Vec<PageImage>,
    pub full_text: String,
    pub fee_from_text: Option<f64>,
    pub status: DocStatus,
    pub error: Option<String>,
}

/// Party role within a deed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Seller,
    Buyer,
    ConfirmingParty,
}

impl PartyRole {
    pub fn db_code(self) -> &'static str {
        match self {
            PartyRole::Seller => "S",
            PartyRole::Buyer => "B",
            PartyRole::ConfirmingParty => "C",
        }
    }
}

/// A single party (seller, buyer, or confirming party) as extracted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Party {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub father_name: Option<String>,
    pub dob: Option<String>,
    pub national_id: Option<String>,
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub pincode: Option<String>,
    pub state: Option<String>,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub email: Option<String>,
    pub share: Option<String>,
}

/// Document-level fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentFields {
    pub transaction_date: Option<String>,
    pub registration_office: Option<String>,
}

/// Property-level fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyFields {
    pub schedule_b_area: Option<String>,
    pub schedule_c_name: Option<String>,
    pub schedule_c_address: Option<String>,
    pub schedule_c_area: Option<String>,
    pub pincode: Option<String>,
    pub state: Option<String>,
    pub sale_consideration: Option<String>,
    pub stamp_duty_fee: Option<String>,
    pub registration_fee: Option<String>,
    pub guidance_value: Option<String>,
    pub cash_payment_mode: Option<String>,
}

/// The complete structured record produced by Stage-2, before persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub document: DocumentFields,
    pub property: PropertyFields,
    pub sellers: Vec<Party>,
    pub buyers: Vec<Party>,
    pub confirming_parties: Vec<Party>,
}

/// Lifecycle state of a batch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
        }
    }
}

/// Aggregate result of one `runBatch` invocation.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub stopped: usize,
}

/// Severity of the batch-completion notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationSeverity {
    Success,
    Warning,
    Error,
}

impl BatchSummary {
    pub fn severity(&self) -> NotificationSeverity {
        if self.failed == 0 {
            NotificationSeverity::Success
        } else if self.successful == 0 {
            NotificationSeverity::Error
        } else {
            NotificationSeverity::Warning
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_follows_the_documented_policy() {
        let all_ok = BatchSummary {
            batch_id: "b".into(),
            total: 3,
            processed: 3,
            successful: 3,
            failed: 0,
            stopped: 0,
        };
        assert_eq!(all_ok.severity(), NotificationSeverity::Success);

        let all_failed = BatchSummary {
            successful: 0,
            failed: 3,
            ..all_ok.clone()
        };
        assert_eq!(all_failed.severity(), NotificationSeverity::Error);

        let mixed = BatchSummary {
            successful: 2,
            failed: 1,
            ..all_ok
        };
        assert_eq!(mixed.severity(), NotificationSeverity::Warning);
    }

    #[test]
    fn party_role_db_codes_are_single_letters() {
        assert_eq!(PartyRole::Seller.db_code(), "S");
        assert_eq!(PartyRole::Buyer.db_code(), "B");
        assert_eq!(PartyRole::ConfirmingParty.db_code(), "C");
    }
}
