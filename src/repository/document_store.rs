//! Thin read-side query surface over the `document` table, used by the
//! duplicate detector (C13).

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::duplicate_detector::{DuplicateLookup, DuplicateMatch};
use crate::schema::document;

use super::diesel_pool::{AsyncSqlitePool, DieselError};

pub struct DocumentStore {
    pool: AsyncSqlitePool,
}

impl DocumentStore {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DuplicateLookup for DocumentStore {
    async fn find_by_hash(&self, sha256: &str) -> Result<Option<DuplicateMatch>, DieselError> {
        let mut conn = self.pool.get().await?;
        let result = document::table
            .filter(document::file_hash.eq(sha256))
            .select((document::document_id, document::batch_id, document::created_at))
            .first::<(String, String, String)>(&mut conn)
            .await
            .optional()?;

        Ok(result.map(|(document_id, batch_id, created_at)| DuplicateMatch {
            document_id,
            batch_id,
            created_at,
        }))
    }
}
