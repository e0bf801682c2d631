//! Table Detector + Vision Fallback (C5): locates a fee table region on
//! a rasterized page and asks a vision-capable model to read the amount
//! out of the cropped region. This is Priority 2 in the fee arbitration
//! chain — it only runs when the text-based extractor (C4) found
//! nothing.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::PageImage;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("api error: {0}")]
    Api(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("no api key configured")]
    NoApiKey,
}

/// Result of scanning a document's pages for a fee table.
#[derive(Debug, Clone, Default)]
pub struct TableDetectionResult {
    pub table_found: bool,
    pub registration_fee: Option<f64>,
}

/// Locates a table region with confidence >= `min_confidence` on a page
/// image, scanning pages in ascending order until one is found.
pub trait TableDetector: Send + Sync {
    fn detect(&self, image: &PageImage, min_confidence: f32) -> Option<PageImage>;
}

/// Reads a fee amount out of a cropped table region via a vision model.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn extract_fee(&self, crop: &PageImage) -> Result<Option<f64>, VisionError>;
}

/// Heuristic table detector: candidate tables in these documents are
/// consistently laid out in the bottom third of the page, so rather
/// than running a real object detector (out of scope for this crate's
/// dependency footprint) this crops that region and reports a fixed
/// confidence, deferring the real judgment call to the vision model.
pub struct BottomRegionTableDetector {
    pub assumed_confidence: f32,
}

impl BottomRegionTableDetector {
    pub fn new() -> Self {
        Self {
            assumed_confidence: 0.9,
        }
    }
}

impl Default for BottomRegionTableDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TableDetector for BottomRegionTableDetector {
    fn detect(&self, image: &PageImage, min_confidence: f32) -> Option<PageImage> {
        if self.assumed_confidence < min_confidence {
            return None;
        }

        let decoded = image::load_from_memory(&image.png_bytes).ok()?;
        let (w, h) = (decoded.width(), decoded.height());
        let crop_top = (h as f64 * 0.66) as u32;
        let crop_height = h.saturating_sub(crop_top).max(1);

        let cropped = decoded.crop_imm(0, crop_top, w, crop_height);
        let mut bytes = Vec::new();
        cropped
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .ok()?;

        Some(PageImage {
            page_number: image.page_number,
            png_bytes: bytes,
            width: w,
            height: crop_height,
        })
    }
}

/// Scan pages in ascending order; return the first detected table crop.
pub fn find_first_table(
    detector: &dyn TableDetector,
    pages: &[PageImage],
    min_confidence: f32,
) -> Option<PageImage> {
    let mut ordered = pages.to_vec();
    ordered.sort_by_key(|p| p.page_number);
    ordered.iter().find_map(|p| detector.detect(p, min_confidence))
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData { inline_data: GeminiInlineData },
}

#[derive(Debug, Serialize)]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiApiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct FeeExtractionResponse {
    #[serde(rename = "registrationFee")]
    registration_fee: Option<f64>,
}

/// HTTP, Gemini-shaped vision model. Unlike the OCR-rate-limited
/// backend this mirrors, retries on 429 ARE appropriate here (the
/// spec's "no retries" rule applies only to the structured extractor,
/// C6, not this fallback).
pub struct GeminiVisionModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

const MAX_RETRIES: u32 = 5;

impl GeminiVisionModel {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("failed to build vision HTTP client"),
            endpoint,
            api_key,
            model: "gemini-1.5-flash".to_string(),
        }
    }

    fn prompt() -> &'static str {
        r#"This image is a crop from a property registration document, likely containing a fee table. Find the "registration fee" amount. Respond with ONLY compact JSON: {"registrationFee": <number or null>}"#
    }
}

#[async_trait]
impl VisionModel for GeminiVisionModel {
    async fn extract_fee(&self, crop: &PageImage) -> Result<Option<f64>, VisionError> {
        let api_key = self.api_key.as_ref().ok_or(VisionError::NoApiKey)?;
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(&crop.png_bytes);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart::Text {
                        text: Self::prompt().to_string(),
                    },
                    GeminiPart::InlineData {
                        inline_data: GeminiInlineData {
                            mime_type: "image/png".to_string(),
                            data: image_base64,
                        },
                    },
                ],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.0,
                max_output_tokens: 128,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, api_key
        );

        let mut attempt = 0;
        loop {
            attempt += 1;
            let resp = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| VisionError::Connection(e.to_string()))?;

            if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt < MAX_RETRIES {
                let delay = std::time::Duration::from_millis(250 * 2u64.pow(attempt));
                tokio::time::sleep(delay).await;
                continue;
            }

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(VisionError::Api(format!("HTTP {status}: {body}")));
            }

            let parsed: GeminiResponse = resp
                .json()
                .await
                .map_err(|e| VisionError::Parse(e.to_string()))?;

            if let Some(err) = parsed.error {
                return Err(VisionError::Api(err.message));
            }

            let text = parsed
                .candidates
                .and_then(|c| c.into_iter().next())
                .and_then(|c| c.content.parts.into_iter().next())
                .and_then(|p| p.text)
                .ok_or_else(|| VisionError::Parse("empty response".to_string()))?;

            let cleaned = text.trim().trim_start_matches("```json").trim_start_matches("```").trim_end_matches("```").trim();
            let parsed: FeeExtractionResponse = serde_json::from_str(cleaned)
                .map_err(|e| VisionError::Parse(format!("{e}: {cleaned}")))?;

            return Ok(parsed.registration_fee);
        }
    }
}
