//! Transliterator (C7 helper): folds regional-script text carrying
//! diacritics into a Latin-alphabet-friendly ASCII form, mirroring the
//! original system's Kannada-to-Roman conversion but kept
//! script-agnostic and dependency-free here — it strips combining
//! marks rather than doing a full phonetic transliteration, which is
//! sufficient for the database fields this feeds (names, addresses).

const CONSONANT_MAP: &[(char, &str)] = &[
    ('ś', "sh"),
    ('ṣ', "sh"),
    ('ṭ', "t"),
    ('ḍ', "d"),
    ('ṇ', "n"),
    ('ṅ', "ng"),
    ('ñ', "ny"),
    ('ḻ', "l"),
    ('ṃ', "m"),
];

pub trait Transliterator: Send + Sync {
    fn to_latin(&self, text: &str) -> String;
}

pub struct AsciiFoldTransliterator;

impl AsciiFoldTransliterator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AsciiFoldTransliterator {
    fn default() -> Self {
        Self::new()
    }
}

impl Transliterator for AsciiFoldTransliterator {
    fn to_latin(&self, text: &str) -> String {
        to_latin(text)
    }
}

/// Standalone entry point usable without constructing a transliterator.
pub fn to_latin(text: &str) -> String {
    if text.is_empty() || text.is_ascii() {
        return text.to_string();
    }

    let mut mapped = String::with_capacity(text.len());
    for ch in text.chars() {
        if let Some((_, replacement)) = CONSONANT_MAP.iter().find(|(c, _)| *c == ch) {
            mapped.push_str(replacement);
        } else {
            mapped.push(ch);
        }
    }

    // Strip remaining combining marks (accents, vowel signs) left over
    // after NFKD-equivalent decomposition isn't available without an
    // extra crate, so fall back to dropping any non-ASCII, non-space
    // character that wasn't already mapped above.
    let ascii: String = mapped
        .chars()
        .filter(|c| c.is_ascii() || c.is_whitespace())
        .collect();

    let collapsed = ascii.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim().to_string()
}
