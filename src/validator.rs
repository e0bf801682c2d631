//! Validator / Normalizer (C7): cleans numeric fields, coerces dates,
//! transliterates regional-script text, computes `guidanceValue`, and
//! resolves the fee-source priority chain.

use chrono::NaiveDate;

use crate::models::{ExtractedRecord, Party};
use crate::transliteration::Transliterator;
use crate::vision::TableDetectionResult;

/// Ratio of guidance value to registration fee used by the original
/// system's `ValidationService.calculate_guidance_value`. The exact
/// constant wasn't present in the retrieved source, so this follows the
/// common Karnataka stamp-duty convention of a 1% registration fee —
/// i.e. `guidanceValue = registrationFee / 0.01`.
const GUIDANCE_VALUE_FEE_RATIO: f64 = 0.01;

/// Chosen registration fee plus which source supplied it, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSource {
    Text,
    Vision,
    Model,
    None,
}

/// Implements the §4.8 priority table: text heuristic (C4) is final if
/// present; otherwise the vision fallback (C5); otherwise the model's
/// own estimate (C6); otherwise absent.
pub fn choose_registration_fee(
    fee_from_text: Option<f64>,
    table_result: Option<&TableDetectionResult>,
    llm_fee: Option<f64>,
) -> (Option<f64>, FeeSource) {
    if let Some(fee) = fee_from_text {
        return (Some(fee), FeeSource::Text);
    }
    if let Some(result) = table_result {
        if let Some(fee) = result.registration_fee {
            return (Some(fee), FeeSource::Vision);
        }
    }
    if let Some(fee) = llm_fee {
        return (Some(fee), FeeSource::Model);
    }
    (None, FeeSource::None)
}

/// Format a numeric fee the way the original persists it: integer form
/// when the value has no fractional part, two decimal places otherwise.
pub fn format_numeric(value: f64) -> String {
    if value == value.floor() {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

pub fn compute_guidance_value(registration_fee: Option<f64>) -> Option<f64> {
    registration_fee.map(|fee| fee / GUIDANCE_VALUE_FEE_RATIO)
}

/// Parse a numeric string, stripping currency symbols and thousands
/// separators. Returns `None` for anything that doesn't parse.
pub fn clean_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        cleaned.parse::<f64>().ok()
    }
}

/// Coerce a free-form date string into `YYYY-MM-DD`. Tries the formats
/// the original documents commonly use (`DD-MM-YYYY`, `DD/MM/YYYY`,
/// already-ISO) and returns the input unchanged if none match.
pub fn coerce_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok() {
        return Some(trimmed.to_string());
    }
    for fmt in ["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    None
}

fn transliterate_party(party: &Party, t: &dyn Transliterator) -> Party {
    Party {
        name: party.name.as_deref().map(|s| t.to_latin(s)),
        gender: party.gender.clone(),
        father_name: party.father_name.as_deref().map(|s| t.to_latin(s)),
        dob: party.dob.clone(),
        national_id: party.national_id.clone(),
        tax_id: party.tax_id.clone(),
        address: party.address.as_deref().map(|s| t.to_latin(s)),
        pincode: party.pincode.clone(),
        state: party.state.clone(),
        phone1: party.phone1.clone(),
        phone2: party.phone2.clone(),
        email: party.email.clone(),
        share: party.share.clone(),
    }
}

/// Normalize an [`ExtractedRecord`] in place: transliterate free-text
/// party fields, coerce the transaction date, and fold in the
/// already-resolved registration fee and guidance value.
pub fn normalize(
    mut record: ExtractedRecord,
    transliterator: &dyn Transliterator,
    resolved_fee: Option<f64>,
) -> ExtractedRecord {
    record.document.transaction_date = record
        .document
        .transaction_date
        .as_deref()
        .and_then(coerce_date);

    record.property.registration_fee = resolved_fee.map(format_numeric);
    record.property.guidance_value = compute_guidance_value(resolved_fee).map(format_numeric);

    record.sellers = record
        .sellers
        .iter()
        .map(|p| transliterate_party(p, transliterator))
        .collect();
    record.buyers = record
        .buyers
        .iter()
        .map(|p| transliterate_party(p, transliterator))
        .collect();
    record.confirming_parties = record
        .confirming_parties
        .iter()
        .map(|p| transliterate_party(p, transliterator))
        .collect();

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transliteration::AsciiFoldTransliterator;

    #[test]
    fn priority_one_text_is_final_even_with_other_sources_present() {
        let table = TableDetectionResult {
            table_found: true,
            registration_fee: Some(2500.0),
        };
        let (fee, source) = choose_registration_fee(Some(1500.0), Some(&table), Some(999.0));
        assert_eq!(fee, Some(1500.0));
        assert_eq!(source, FeeSource::Text);
    }

    #[test]
    fn priority_two_vision_used_when_text_absent() {
        let table = TableDetectionResult {
            table_found: true,
            registration_fee: Some(2500.0),
        };
        let (fee, source) = choose_registration_fee(None, Some(&table), Some(999.0));
        assert_eq!(fee, Some(2500.0));
        assert_eq!(source, FeeSource::Vision);
    }

    #[test]
    fn priority_three_model_used_when_others_absent() {
        let (fee, source) = choose_registration_fee(None, None, Some(999.0));
        assert_eq!(fee, Some(999.0));
        assert_eq!(source, FeeSource::Model);
    }

    #[test]
    fn all_absent_yields_none_without_panicking() {
        let (fee, source) = choose_registration_fee(None, None, None);
        assert_eq!(fee, None);
        assert_eq!(source, FeeSource::None);
    }

    #[test]
    fn format_numeric_preserves_integer_form() {
        assert_eq!(format_numeric(1500.0), "1500");
        assert_eq!(format_numeric(1500.5), "1500.50");
    }

    #[test]
    fn coerce_date_handles_common_original_formats() {
        assert_eq!(coerce_date("2024-01-05").as_deref(), Some("2024-01-05"));
        assert_eq!(coerce_date("05-01-2024").as_deref(), Some("2024-01-05"));
        assert_eq!(coerce_date("05/01/2024").as_deref(), Some("2024-01-05"));
        assert_eq!(coerce_date("not a date"), None);
    }

    #[test]
    fn clean_numeric_strips_currency_formatting() {
        assert_eq!(clean_numeric("Rs. 1,500.00"), Some(1500.0));
        assert_eq!(clean_numeric("garbage"), None);
    }

    #[test]
    fn normalize_fills_in_resolved_fee_and_guidance_value() {
        let record = ExtractedRecord::default();
        let t = AsciiFoldTransliterator::new();
        let normalized = normalize(record, &t, Some(1500.0));
        assert_eq!(normalized.property.registration_fee.as_deref(), Some("1500"));
        assert_eq!(normalized.property.guidance_value.as_deref(), Some("150000"));
    }
}
