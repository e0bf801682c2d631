//! Text Extractor (C3): produces per-page text either from the PDF's
//! embedded text layer (native mode) or via OCR over rasterized pages
//! (OCR mode). Pages are joined with an explicit `--- Page N ---`
//! separator so downstream consumers can locate page boundaries in
//! `fullText`.
//!
//! Per-page work is independent, so both modes dispatch up to
//! `concurrency` pages at once: each worker thread pulls the next page
//! off a shared queue, serializes it to its own temp file (OCR mode) or
//! invokes the CLI tool directly for its page range (native mode), and
//! every temp file is unlinked on every exit path via `tempfile`'s
//! `Drop` impl, success or failure.

use std::collections::VecDeque;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::ExtractionMode;
use crate::models::PageImage;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("required tool not found: {0}")]
    ToolNotFound(String),
    #[error("extraction failed: {0}")]
    Failed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstract contract: produce `(pageNumber, text)` pairs in ascending
/// order. `concurrency` bounds how many pages are dispatched at once.
pub trait TextExtractor: Send + Sync {
    fn per_page(
        &self,
        source: &Path,
        page_images: &[PageImage],
        mode: ExtractionMode,
        language: &str,
        concurrency: usize,
    ) -> Result<Vec<(u32, String)>, ExtractError>;
}

/// Default extractor: `pdftotext` for native mode, `tesseract` over the
/// supplied page images for OCR mode.
pub struct CliTextExtractor;

impl CliTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CliTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for CliTextExtractor {
    fn per_page(
        &self,
        source: &Path,
        page_images: &[PageImage],
        mode: ExtractionMode,
        language: &str,
        concurrency: usize,
    ) -> Result<Vec<(u32, String)>, ExtractError> {
        match mode {
            ExtractionMode::Native => extract_native(source, concurrency),
            ExtractionMode::Ocr => extract_ocr(page_images, language, concurrency),
        }
    }
}

/// Runs `work` over every item in `items`, dispatching up to
/// `concurrency` of them at once across plain OS threads (this module is
/// synchronous and always called from inside `spawn_blocking`). Results
/// are collected back in ascending page-number order regardless of
/// completion order.
fn run_with_concurrency<T, F>(items: Vec<T>, concurrency: usize, work: F) -> Result<Vec<(u32, String)>, ExtractError>
where
    T: Send,
    F: Fn(&T) -> Result<(u32, String), ExtractError> + Sync,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let worker_count = concurrency.max(1).min(items.len());
    let queue: Mutex<VecDeque<T>> = Mutex::new(items.into_iter().collect());
    let results: Mutex<Vec<Result<(u32, String), ExtractError>>> = Mutex::new(Vec::new());

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            scope.spawn(|| loop {
                let item = queue.lock().expect("extractor queue mutex poisoned").pop_front();
                let Some(item) = item else { break };
                let outcome = work(&item);
                results.lock().expect("extractor results mutex poisoned").push(outcome);
            });
        }
    });

    let mut pages = Vec::new();
    for result in results.into_inner().expect("extractor results mutex poisoned") {
        pages.push(result?);
    }
    pages.sort_by_key(|(page_number, _)| *page_number);
    Ok(pages)
}

fn extract_native(source: &Path, concurrency: usize) -> Result<Vec<(u32, String)>, ExtractError> {
    let count = pdf_page_count(source)?;
    let page_numbers: Vec<u32> = (1..=count).collect();
    run_with_concurrency(page_numbers, concurrency, |page| {
        run_pdftotext(source, *page).map(|text| (*page, text))
    })
}

fn extract_ocr(page_images: &[PageImage], language: &str, concurrency: usize) -> Result<Vec<(u32, String)>, ExtractError> {
    run_with_concurrency(page_images.to_vec(), concurrency, |image| {
        run_tesseract_on_bytes(&image.png_bytes, language).map(|text| (image.page_number, text))
    })
}

fn pdf_page_count(source: &Path) -> Result<u32, ExtractError> {
    let output = Command::new("pdfinfo").arg(source).output();
    let output = match output {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ExtractError::ToolNotFound("pdfinfo".to_string()));
        }
        Err(e) => return Err(ExtractError::Io(e)),
    };
    if !output.status.success() {
        return Err(ExtractError::Failed("pdfinfo failed".to_string()));
    }
    let text = String::from_utf8_lossy(&output.stdout);
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("Pages:") {
            if let Ok(n) = rest.trim().parse::<u32>() {
                return Ok(n);
            }
        }
    }
    Err(ExtractError::Failed("no page count in pdfinfo output".to_string()))
}

fn run_pdftotext(source: &Path, page: u32) -> Result<String, ExtractError> {
    let page_str = page.to_string();
    let output = Command::new("pdftotext")
        .args(["-layout", "-enc", "UTF-8", "-f", &page_str, "-l", &page_str])
        .arg(source)
        .arg("-")
        .output();

    match output {
        Ok(o) if o.status.success() => Ok(String::from_utf8_lossy(&o.stdout).to_string()),
        Ok(o) => Err(ExtractError::Failed(format!(
            "pdftotext failed: {}",
            String::from_utf8_lossy(&o.stderr)
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractError::ToolNotFound("pdftotext".to_string()))
        }
        Err(e) => Err(ExtractError::Io(e)),
    }
}

fn run_tesseract_on_bytes(png_bytes: &[u8], language: &str) -> Result<String, ExtractError> {
    let mut file = NamedTempFile::new()?;
    {
        use std::io::Write;
        file.write_all(png_bytes)?;
        file.flush()?;
    }

    let output = Command::new("tesseract")
        .arg(file.path())
        .arg("stdout")
        .args(["-l", language])
        .output();

    match output {
        Ok(o) if o.status.success() => Ok(String::from_utf8_lossy(&o.stdout).to_string()),
        Ok(o) => Err(ExtractError::Failed(format!(
            "tesseract failed: {}",
            String::from_utf8_lossy(&o.stderr)
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractError::ToolNotFound("tesseract".to_string()))
        }
        Err(e) => Err(ExtractError::Io(e)),
    }
}

/// Join `(pageNumber, text)` pairs into the canonical `fullText`
/// representation, with explicit page separators.
pub fn join_pages(pages: &[(u32, String)]) -> String {
    pages
        .iter()
        .map(|(n, text)| format!("--- Page {n} ---\n{text}"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrent_dispatch_preserves_ascending_page_order() {
        let pages: Vec<u32> = (1..=9).collect();
        let result = run_with_concurrency(pages, 4, |page| Ok((*page, format!("text-{page}")))).unwrap();
        let numbers: Vec<u32> = result.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, (1..=9).collect::<Vec<_>>());
    }

    #[test]
    fn a_single_failing_page_fails_the_whole_extraction() {
        let pages: Vec<u32> = (1..=3).collect();
        let result: Result<Vec<(u32, String)>, ExtractError> = run_with_concurrency(pages, 3, |page| {
            if *page == 2 {
                Err(ExtractError::Failed("boom".to_string()))
            } else {
                Ok((*page, String::new()))
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn concurrency_is_clamped_to_the_item_count() {
        let pages: Vec<u32> = vec![1];
        let result = run_with_concurrency(pages, 8, |page| Ok((*page, String::new()))).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn join_pages_inserts_explicit_separators() {
        let pages = vec![(1, "first page".to_string()), (2, "second page".to_string())];
        let joined = join_pages(&pages);
        assert!(joined.contains("--- Page 1 ---"));
        assert!(joined.contains("--- Page 2 ---"));
        assert!(joined.find("Page 1").unwrap() < joined.find("Page 2").unwrap());
    }
}
