//! Batch Session Store (C12): tracks batch identity, lifecycle state,
//! and aggregate counts.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::models::BatchStatus;
use crate::schema::batch_session;

use super::diesel_pool::{AsyncSqlitePool, DieselError};
use super::models::BatchSessionRow;

pub struct BatchStore {
    pool: AsyncSqlitePool,
}

impl BatchStore {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, batch_id: &str, name: &str, uploaded_count: usize) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        let row = BatchSessionRow {
            batch_id: batch_id.to_string(),
            name: name.to_string(),
            uploaded_at: Utc::now().to_rfc3339(),
            processing_started_at: None,
            uploaded_count: uploaded_count as i32,
            processed_count: 0,
            failed_count: 0,
            status: BatchStatus::Pending.as_str().to_string(),
        };
        diesel::replace_into(batch_session::table)
            .values(&row)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn mark_processing(&self, batch_id: &str) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        diesel::update(batch_session::table.find(batch_id))
            .set((
                batch_session::status.eq(BatchStatus::Processing.as_str()),
                batch_session::processing_started_at.eq(Utc::now().to_rfc3339()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn mark_completed(
        &self,
        batch_id: &str,
        processed_count: usize,
        failed_count: usize,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        diesel::update(batch_session::table.find(batch_id))
            .set((
                batch_session::status.eq(BatchStatus::Completed.as_str()),
                batch_session::processed_count.eq(processed_count as i32),
                batch_session::failed_count.eq(failed_count as i32),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }
}
