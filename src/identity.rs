//! Document identity derivation (C1): turns an input filename into a
//! stable `documentId`, independent of where the file currently sits.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Derive a stable document id from a source path.
///
/// The id is the file stem (lowercased, non-alphanumerics collapsed to
/// `-`) with a short hash suffix derived from the full file name, so
/// that two differently-named files never collide and the same file
/// name always re-derives the same id across runs.
pub fn derive_document_id(source_path: &Path) -> String {
    let stem = source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");

    let slug = slugify(stem);

    let file_name = source_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(stem);
    let mut hasher = Sha256::new();
    hasher.update(file_name.as_bytes());
    let digest = hasher.finalize();
    let suffix = hex::encode(&digest[..4]);

    format!("{slug}-{suffix}")
}

fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && !out.is_empty() {
            out.push('-');
            last_was_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        "document".to_string()
    } else {
        out
    }
}

/// Classify whether a path looks like something this pipeline can ingest.
pub fn is_supported_input(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("pdf")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn derivation_is_stable_across_calls() {
        let p = PathBuf::from("/batch/2024/Deed No. 1023 (final).pdf");
        let a = derive_document_id(&p);
        let b = derive_document_id(&p);
        assert_eq!(a, b);
        assert!(a.starts_with("deed-no-1023-final-"));
    }

    #[test]
    fn different_file_names_never_collide() {
        let a = derive_document_id(Path::new("a.pdf"));
        let b = derive_document_id(Path::new("b.pdf"));
        assert_ne!(a, b);
    }

    #[test]
    fn supports_only_pdf_extension() {
        assert!(is_supported_input(Path::new("deed.pdf")));
        assert!(is_supported_input(Path::new("deed.PDF")));
        assert!(!is_supported_input(Path::new("deed.docx")));
    }
}
