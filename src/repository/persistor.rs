//! Persistor (C8): upserts the document and property rows, replaces
//! the party rows, all within one transaction. Party replacement is
//! unconditional on every save — there is no "manually corrected, do
//! not overwrite" tracking, matching the original system exactly.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::models::{ExtractedRecord, Party, PartyRole};
use crate::schema::{document, party, property};

use super::diesel_pool::{AsyncSqlitePool, DieselError};
use super::models::{DocumentRow, NewPartyRow, PropertyRow};

pub struct Persistor {
    pool: AsyncSqlitePool,
}

impl Persistor {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert `document`, upsert `property`, and replace every `party`
    /// row for `document_id`, all inside one transaction.
    pub async fn save(
        &self,
        document_id: &str,
        batch_id: &str,
        file_hash: &str,
        file_hash_blake3: Option<&str>,
        record: &ExtractedRecord,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().to_rfc3339();

        let document_row = DocumentRow {
            document_id: document_id.to_string(),
            batch_id: batch_id.to_string(),
            file_hash: file_hash.to_string(),
            file_hash_blake3: file_hash_blake3.map(|s| s.to_string()),
            transaction_date: record.document.transaction_date.clone(),
            registration_office: record.document.registration_office.clone(),
            created_at: now.clone(),
            updated_at: now,
        };

        let property_row = PropertyRow {
            document_id: document_id.to_string(),
            schedule_b_area: record.property.schedule_b_area.clone(),
            schedule_c_name: record.property.schedule_c_name.clone(),
            schedule_c_address: record.property.schedule_c_address.clone(),
            schedule_c_area: record.property.schedule_c_area.clone(),
            pincode: record.property.pincode.clone(),
            state: record.property.state.clone(),
            sale_consideration: record.property.sale_consideration.clone(),
            stamp_duty_fee: record.property.stamp_duty_fee.clone(),
            registration_fee: record.property.registration_fee.clone(),
            guidance_value: record.property.guidance_value.clone(),
            cash_payment_mode: record.property.cash_payment_mode.clone(),
        };

        let party_rows = build_party_rows(document_id, &record.sellers, PartyRole::Seller)
            .into_iter()
            .chain(build_party_rows(document_id, &record.buyers, PartyRole::Buyer))
            .chain(build_party_rows(
                document_id,
                &record.confirming_parties,
                PartyRole::ConfirmingParty,
            ))
            .collect::<Vec<_>>();

        let doc_id_for_delete = document_id.to_string();

        conn.transaction::<_, DieselError, _>(|conn| {
            Box::pin(async move {
                diesel::replace_into(document::table)
                    .values(&document_row)
                    .execute(conn)
                    .await?;

                diesel::replace_into(property::table)
                    .values(&property_row)
                    .execute(conn)
                    .await?;

                diesel::delete(party::table.filter(party::document_id.eq(&doc_id_for_delete)))
                    .execute(conn)
                    .await?;

                if !party_rows.is_empty() {
                    diesel::insert_into(party::table)
                        .values(&party_rows)
                        .execute(conn)
                        .await?;
                }

                Ok(())
            })
        })
        .await
    }
}

fn build_party_rows(document_id: &str, parties: &[Party], role: PartyRole) -> Vec<NewPartyRow> {
    parties
        .iter()
        .map(|p| NewPartyRow {
            document_id: document_id.to_string(),
            role: role.db_code().to_string(),
            name: p.name.clone(),
            gender: p.gender.clone(),
            father_name: p.father_name.clone(),
            dob: p.dob.clone(),
            national_id: p.national_id.clone(),
            tax_id: p.tax_id.clone(),
            address: p.address.clone(),
            pincode: p.pincode.clone(),
            state: p.state.clone(),
            phone1: p.phone1.clone(),
            phone2: p.phone2.clone(),
            email: p.email.clone(),
            share: p.share.clone(),
        })
        .collect()
}
