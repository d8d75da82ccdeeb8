//! `ExtractKeywords` and `NormalizeSpecName` (§4.2).

mod normalizer;
mod phrases;
mod stopwords;

pub use normalizer::{NormalizedSpecName, SpecNormalizer};

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::LazyLock;

/// One extracted keyword: either a preserved quoted/curated phrase, or a
/// single normalized word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// A multi-word phrase kept intact (quoted, or a curated domain phrase).
    Phrase(String),
    /// A single stop-word-filtered, spelling-normalized token.
    Word(String),
}

impl Keyword {
    /// The keyword's text, regardless of variant.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Phrase(s) | Self::Word(s) => s,
        }
    }

    /// True if this is a multi-word phrase keyword.
    #[must_use]
    pub const fn is_phrase(&self) -> bool {
        matches!(self, Self::Phrase(_))
    }
}

static LOCALE_SPELLINGS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        ("colour", "color"),
        ("colours", "colors"),
        ("metre", "meter"),
        ("metres", "meters"),
        ("litre", "liter"),
        ("litres", "liters"),
        ("tyre", "tire"),
        ("tyres", "tires"),
        ("kerb", "curb"),
        ("grey", "gray"),
        ("aluminium", "aluminum"),
        ("centre", "center"),
        ("centres", "centers"),
    ]
    .into_iter()
    .collect()
});

/// Applies locale spelling normalization (`colour`→`color`, etc) to a single
/// already-lowercased token.
fn normalize_spelling(token: &str) -> String {
    LOCALE_SPELLINGS.get(token).map_or_else(|| token.to_string(), |v| (*v).to_string())
}

/// Extracts quoted substrings (single or double quotes) as phrase keywords,
/// returning the quoted phrases found and the remaining text with the quoted
/// spans blanked out.
fn extract_quoted(lowercased: &str) -> (Vec<String>, String) {
    let mut phrases = Vec::new();
    let mut remainder = String::with_capacity(lowercased.len());
    let mut chars = lowercased.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' || c == '\'' {
            let quote = c;
            let mut phrase = String::new();
            let mut closed = false;
            for inner in chars.by_ref() {
                if inner == quote {
                    closed = true;
                    break;
                }
                phrase.push(inner);
            }
            let trimmed = phrase.trim();
            if closed && !trimmed.is_empty() {
                phrases.push(trimmed.to_string());
            }
            remainder.push(' ');
        } else {
            remainder.push(c);
        }
    }

    (phrases, remainder)
}

/// Tokenizes text into lowercase alphanumeric words, treating any other
/// character as a separator.
fn tokenize(text: &str) -> Vec<String> {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Extracts a de-duplicated keyword sequence from a free-form question
/// (§4.2). Order of first occurrence is preserved; callers needing set
/// semantics should compare via a `HashSet`.
#[must_use]
pub fn extract_keywords(question: &str) -> Vec<Keyword> {
    let lower_full = question.to_lowercase();
    let (quoted_phrases, remainder) = extract_quoted(&lower_full);

    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    for phrase in &quoted_phrases {
        let kw = Keyword::Phrase(phrase.clone());
        if seen.insert(kw.clone()) {
            keywords.push(kw);
        }
    }

    for phrase in phrases::detect_phrases(&lower_full, &quoted_phrases) {
        let kw = Keyword::Phrase(phrase);
        if seen.insert(kw.clone()) {
            keywords.push(kw);
        }
    }

    for token in tokenize(&remainder) {
        if token.chars().count() <= 1 || stopwords::is_stop_word(&token) {
            continue;
        }
        let kw = Keyword::Word(normalize_spelling(&token));
        if seen.insert(kw.clone()) {
            keywords.push(kw);
        }
    }

    keywords
}
