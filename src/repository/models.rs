//! Diesel row structs mirroring `schema.rs`.

use diesel::prelude::*;

use crate::schema::{batch_session, document, party, property};

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = document)]
pub struct DocumentRow {
    pub document_id: String,
    pub batch_id: String,
    pub file_hash: String,
    pub file_hash_blake3: Option<String>,
    pub transaction_date: Option<String>,
    pub registration_office: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = property)]
pub struct PropertyRow {
    pub document_id: String,
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

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = party)]
pub struct NewPartyRow {
    pub document_id: String,
    pub role: String,
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

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = batch_session)]
pub struct BatchSessionRow {
    pub batch_id: String,
    pub name: String,
    pub uploaded_at: String,
    pub processing_started_at: Option<String>,
    pub uploaded_count: i32,
    pub processed_count: i32,
    pub failed_count: i32,
    pub status: String,
}
