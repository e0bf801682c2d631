//! Fee Extractor (C4): heuristic scan over extracted text for a
//! registration-fee amount. This is Priority 1 in the fee arbitration
//! chain (see `validator::choose_registration_fee`) — when it finds a
//! value, that value is final and the vision/LLM fallbacks never run.

/// Floor below which a candidate amount is discarded outright.
const DEFAULT_MIN_FEE: f64 = 100.0;
/// Cap applied to amounts found on "miscellaneous charges" lines rather
/// than discarded, since those lines commonly bundle several small fees.
const DEFAULT_MAX_MISC: f64 = 3000.0;

const FEE_LABELS: &[&str] = &[
    "registration fee",
    "regn fee",
    "regn. fee",
    "reg fee",
    "registration charges",
];
const MISC_LABELS: &[&str] = &["miscellaneous", "misc charges", "other charges"];
const STAMP_LABELS: &[&str] = &["stamp duty"];

pub trait FeeExtractor: Send + Sync {
    fn from_text(&self, text: &str, min_fee: f64, max_misc: f64) -> Option<f64>;
}

pub struct HeuristicFeeExtractor;

impl HeuristicFeeExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeuristicFeeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeeExtractor for HeuristicFeeExtractor {
    fn from_text(&self, text: &str, min_fee: f64, max_misc: f64) -> Option<f64> {
        extract_fee(text, min_fee, max_misc)
    }
}

/// Standalone entry point usable without constructing a [`HeuristicFeeExtractor`].
pub fn extract_fee(text: &str, min_fee: f64, max_misc: f64) -> Option<f64> {
    let lines: Vec<&str> = text.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        let lower = line.to_ascii_lowercase();
        let is_fee_line = FEE_LABELS.iter().any(|l| lower.contains(l))
            || STAMP_LABELS.iter().any(|l| lower.contains(l));
        let is_misc_line = MISC_LABELS.iter().any(|l| lower.contains(l));

        if !is_fee_line && !is_misc_line {
            continue;
        }

        let candidate = find_amount_in(line)
            .or_else(|| lines.get(idx + 1).and_then(|next| find_amount_in(next)));

        let Some(amount) = candidate else { continue };

        if is_misc_line && !is_fee_line {
            if amount < min_fee {
                continue;
            }
            return Some(amount.min(max_misc));
        }

        if amount >= min_fee {
            return Some(amount);
        }
    }

    None
}

/// Find the first plausible currency-formatted number in a line: strips
/// thousands separators (`,`) and currency symbols (`₹`, `Rs.`, `INR`).
fn find_amount_in(line: &str) -> Option<f64> {
    let cleaned = line
        .replace('₹', "")
        .replace("Rs.", "")
        .replace("Rs", "")
        .replace("INR", "");

    let mut current = String::new();
    let mut best: Option<f64> = None;

    for ch in cleaned.chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_digit() || ch == '.' {
            current.push(ch);
        } else if ch == ',' && !current.is_empty() {
            // thousands separator inside a number, e.g. "1,500" — drop it
            continue;
        } else if !current.is_empty() {
            if let Ok(value) = current.parse::<f64>() {
                if best.is_none() {
                    best = Some(value);
                }
            }
            current.clear();
        }
    }

    best
}
