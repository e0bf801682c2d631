//! Rasterizer (C2): converts PDF pages into normalized page images.
//!
//! Shells out to `pdftoppm` (poppler-utils) and writes output into a
//! per-call `tempfile::TempDir` so temp files are cleaned up on every
//! exit path, including error paths.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;
use thiserror::Error;

use crate::models::PageImage;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("required tool not found: {0}")]
    ToolNotFound(String),
    #[error("rasterization failed: {0}")]
    Failed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstract contract for converting a PDF into ordered page images,
/// bounded by `max_pages` and normalized to `target_width`.
pub trait Rasterizer: Send + Sync {
    fn to_pages(&self, source: &Path, max_pages: u32) -> Result<Vec<PageImage>, RasterError>;
}

/// `pdftoppm`-backed rasterizer with width normalization.
pub struct PdftoppmRasterizer {
    dpi: u32,
    target_width: u32,
}

impl PdftoppmRasterizer {
    pub fn new(target_width: u32) -> Self {
        Self {
            dpi: 300,
            target_width,
        }
    }

    fn find_page_image(dir: &Path, page_num: u32) -> Option<std::path::PathBuf> {
        for digits in [2, 3, 4] {
            let filename = format!("page-{:0width$}.png", page_num, width = digits);
            let path = dir.join(&filename);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }

    fn normalize(&self, bytes: Vec<u8>) -> Result<(Vec<u8>, u32, u32), RasterError> {
        let img = image::load_from_memory(&bytes).map_err(|e| RasterError::Failed(e.to_string()))?;
        let (w, h) = (img.width(), img.height());

        if self.target_width == 0 || w as f64 <= self.target_width as f64 * 1.2 {
            return Ok((bytes, w, h));
        }

        let new_height = ((self.target_width as f64) * (h as f64) / (w as f64)).round() as u32;
        let resized = img.resize(
            self.target_width,
            new_height.max(1),
            image::imageops::FilterType::Lanczos3,
        );

        let mut out = Vec::new();
        resized
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .map_err(|e| RasterError::Failed(e.to_string()))?;

        Ok((out, resized.width(), resized.height()))
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn to_pages(&self, source: &Path, max_pages: u32) -> Result<Vec<PageImage>, RasterError> {
        let temp_dir = TempDir::new()?;
        let output_prefix = temp_dir.path().join("page");

        let status = Command::new("pdftoppm")
            .args(["-png", "-r"])
            .arg(self.dpi.to_string())
            .args(["-l"])
            .arg(max_pages.to_string())
            .arg(source)
            .arg(&output_prefix)
            .status();

        match status {
            Ok(s) if s.success() => {}
            Ok(s) => return Err(RasterError::Failed(format!("pdftoppm exited with {s}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RasterError::ToolNotFound("pdftoppm".to_string()));
            }
            Err(e) => return Err(RasterError::Io(e)),
        }

        let mut pages = Vec::new();
        for page_number in 1..=max_pages {
            let Some(path) = Self::find_page_image(temp_dir.path(), page_number) else {
                break;
            };
            let raw = std::fs::read(&path)?;
            let (png_bytes, width, height) = self.normalize(raw)?;
            pages.push(PageImage {
                page_number,
                png_bytes,
                width,
                height,
            });
        }

        Ok(pages)
    }
}

/// Returns the page count of a PDF via `pdfinfo`, used to decide how many
/// pages the rasterizer should actually request.
pub fn page_count(source: &Path) -> Result<u32, RasterError> {
    let output = Command::new("pdfinfo").arg(source).output();

    let output = match output {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RasterError::ToolNotFound("pdfinfo".to_string()));
        }
        Err(e) => return Err(RasterError::Io(e)),
    };

    if !output.status.success() {
        return Err(RasterError::Failed("pdfinfo failed".to_string()));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("Pages:") {
            if let Ok(n) = rest.trim().parse::<u32>() {
                return Ok(n);
            }
        }
    }
    Err(RasterError::Failed(
        "could not find page count in pdfinfo output".to_string(),
    ))
}
