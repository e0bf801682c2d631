//! Duplicate Detector (C13): content-hash lookup for already-ingested
//! inputs. Computes SHA-256 (the canonical lookup key) and BLAKE3 (a
//! faster secondary fingerprint, mirroring the teacher's dual-hash
//! columns) while streaming the input once.

use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ContentFingerprint {
    pub sha256: String,
    pub blake3: String,
}

/// Hash a file's contents in fixed-size chunks, computing both digests
/// in a single pass.
pub fn hash_file(path: &Path) -> Result<ContentFingerprint, HashError> {
    let mut file = std::fs::File::open(path)?;
    let mut sha = Sha256::new();
    let mut b3 = blake3::Hasher::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        sha.update(&buf[..n]);
        b3.update(&buf[..n]);
    }

    Ok(ContentFingerprint {
        sha256: hex::encode(sha.finalize()),
        blake3: hex::encode(b3.finalize().as_bytes()),
    })
}

#[derive(Debug, Clone)]
pub struct DuplicateMatch {
    pub document_id: String,
    pub batch_id: String,
    pub created_at: String,
}

/// Abstract lookup used by the duplicate detector; implemented by the
/// document store so the detector itself stays storage-agnostic.
#[async_trait]
pub trait DuplicateLookup: Send + Sync {
    async fn find_by_hash(&self, sha256: &str) -> Result<Option<DuplicateMatch>, crate::repository::DieselError>;
}

/// Check a batch of input paths for duplicates against the store,
/// partitioning them into unique vs. already-seen.
pub async fn check_batch(
    paths: &[std::path::PathBuf],
    lookup: &dyn DuplicateLookup,
) -> Result<(Vec<std::path::PathBuf>, Vec<(std::path::PathBuf, DuplicateMatch)>), HashError> {
    let mut unique = Vec::new();
    let mut duplicates = Vec::new();

    for path in paths {
        let fingerprint = hash_file(path)?;
        match lookup.find_by_hash(&fingerprint.sha256).await {
            Ok(Some(existing)) => duplicates.push((path.clone(), existing)),
            Ok(None) => unique.push(path.clone()),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "duplicate lookup failed, treating as unique");
                unique.push(path.clone());
            }
        }
    }

    Ok((unique, duplicates))
}
