//! Structured Extractor (C6): converts full document text (plus an
//! optional page-image prefix) into an [`ExtractedRecord`] via a
//! language model.
//!
//! Unlike the vision fallback (C5), no retries are performed at this
//! layer — a transient failure here simply fails the document and the
//! batch continues.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{ExtractedRecord, PageImage};

#[derive(Debug)]
pub enum LlmError {
    Connection(String),
    Api(String),
    Parse(String),
    Timeout,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::Connection(msg) => write!(f, "connection error: {msg}"),
            LlmError::Api(msg) => write!(f, "api error: {msg}"),
            LlmError::Parse(msg) => write!(f, "parse error: {msg}"),
            LlmError::Timeout => write!(f, "model invocation timed out"),
        }
    }
}

impl std::error::Error for LlmError {}

/// Abstract contract for the structured-extraction collaborator.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn extract(
        &self,
        full_text: &str,
        page_images: &[PageImage],
    ) -> Result<ExtractedRecord, LlmError>;
}

const EXTRACTION_PROMPT: &str = r#"You are extracting structured data from a property sale-deed document. Read the full text below and respond with ONLY a single JSON object matching this exact shape (use null for anything not present, never invent a value):

{
  "document": {"transactionDate": string|null, "registrationOffice": string|null},
  "property": {
    "scheduleBArea": string|null, "scheduleCName": string|null, "scheduleCAddress": string|null,
    "scheduleCArea": string|null, "pincode": string|null, "state": string|null,
    "saleConsideration": string|null, "stampDutyFee": string|null, "registrationFee": string|null,
    "guidanceValue": string|null, "cashPaymentMode": string|null
  },
  "sellers": [{"name": string|null, "gender": string|null, "fatherName": string|null, "dob": string|null, "nationalId": string|null, "taxId": string|null, "address": string|null, "pincode": string|null, "state": string|null, "phone1": string|null, "phone2": string|null, "email": string|null, "share": string|null}],
  "buyers": [...same shape as sellers...],
  "confirmingParties": [...same shape as sellers...]
}

Document text:
"#;

/// Default HTTP-based structured extractor. Targets an Ollama-style
/// `/api/generate` endpoint for local models; point `endpoint` at a
/// hosted provider's compatible surface as needed.
pub struct HttpLanguageModel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_content_chars: usize,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    format: &'static str,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl HttpLanguageModel {
    pub fn new(endpoint: String, model: String, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .expect("failed to build LLM HTTP client"),
            endpoint,
            model,
            max_content_chars: 60_000,
        }
    }

    fn truncate<'a>(&self, text: &'a str) -> &'a str {
        if text.len() <= self.max_content_chars {
            return text;
        }
        let mut end = self.max_content_chars;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn extract(
        &self,
        full_text: &str,
        _page_images: &[PageImage],
    ) -> Result<ExtractedRecord, LlmError> {
        let truncated = self.truncate(full_text);
        let prompt = format!("{EXTRACTION_PROMPT}{truncated}");

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt,
            stream: false,
            format: "json",
            options: GenerateOptions { temperature: 0.0 },
        };

        let url = format!("{}/api/generate", self.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Connection(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {status}: {body}")));
        }

        let generated: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        serde_json::from_str(&generated.response)
            .map_err(|e| LlmError::Parse(format!("{e}: {}", generated.response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_utf8_boundaries() {
        let model = HttpLanguageModel::new("http://x".into(), "m".into(), 1);
        let mut model = model;
        model.max_content_chars = 5;
        let truncated = model.truncate("héllo world");
        assert!(std::str::from_utf8(truncated.as_bytes()).is_ok());
    }

    #[test]
    fn extracted_record_round_trips_through_json() {
        let record = ExtractedRecord::default();
        let json = serde_json::to_string(&record).unwrap();
        let back: ExtractedRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sellers.len(), 0);
    }
}
