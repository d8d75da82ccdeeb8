//! Rule-based intent classification (§4.3).

use crate::keyword;
use regex::Regex;

/// The five intents a question can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// A structured spec lookup.
    SpecLookup,
    /// A unique-selling-point lookup.
    UspLookup,
    /// A product comparison.
    Comparison,
    /// A frequently-asked-question style query.
    Faq,
    /// Intent could not be determined with sufficient confidence.
    Unknown,
}

impl Intent {
    /// Parses an intent hint string from a request, if recognized.
    #[must_use]
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_lowercase().as_str() {
            "spec_lookup" => Some(Self::SpecLookup),
            "usp_lookup" => Some(Self::UspLookup),
            "comparison" => Some(Self::Comparison),
            "faq" => Some(Self::Faq),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// The result of classifying a question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifiedIntent {
    /// The classified intent.
    pub intent: Intent,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

const USP_PATTERNS: &[&str] = &[
    "unique", "special", "usp", "usps", "selling point", "best feature", "advantage", "benefit", "why should",
    "what makes",
];

const FAQ_PREFIXES: &[&str] = &["how do i", "can i", "what if"];

const SPEC_KEYWORDS: &[&str] = &[
    "spec", "specs", "specification", "specifications", "horsepower", "torque", "engine", "mileage", "mpg",
    "fuel", "color", "colour", "warranty", "dimensions", "weight", "capacity", "feature", "size", "towing",
    "cargo", "brake", "brakes", "suspension", "wheels", "tires", "tyres", "safety", "airbag", "transmission",
    "drivetrain", "clearance", "seating", "trunk", "infotainment", "navigation", "climate", "battery", "range",
    "charging", "emissions", "acceleration", "top speed", "horsepower rating",
];

/// Word-boundary substring match: true if `phrase` appears in `haystack` at
/// a word boundary on both sides. Used to avoid false positives like
/// `"suspension"` matching a bare substring `"usp"`.
fn contains_word(haystack: &str, phrase: &str) -> bool {
    let pattern = format!(r"\b{}\b", regex::escape(phrase));
    Regex::new(&pattern).is_ok_and(|re| re.is_match(haystack))
}

/// Classifies `question` using the ordered rule families
/// (comparison > usp > faq > spec), with `competitor_names` feeding the
/// comparison family's `or <competitor>` rule.
#[must_use]
pub fn classify(question: &str, competitor_names: &[String]) -> ClassifiedIntent {
    let lower = question.to_lowercase();
    let trimmed = lower.trim();

    if trimmed.chars().count() < 3 {
        return ClassifiedIntent {
            intent: Intent::Unknown,
            confidence: 0.0,
        };
    }

    if is_comparison(trimmed, competitor_names) {
        return ClassifiedIntent {
            intent: Intent::Comparison,
            confidence: 0.9,
        };
    }

    if USP_PATTERNS.iter().any(|p| contains_word(trimmed, p)) {
        return ClassifiedIntent {
            intent: Intent::UspLookup,
            confidence: 0.85,
        };
    }

    if FAQ_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return ClassifiedIntent {
            intent: Intent::Faq,
            confidence: 0.8,
        };
    }

    let spec_matches = SPEC_KEYWORDS.iter().filter(|kw| contains_word(trimmed, kw)).count();
    if spec_matches > 0 {
        return ClassifiedIntent {
            intent: Intent::SpecLookup,
            #[allow(clippy::cast_precision_loss)]
            confidence: (0.6 + 0.15 * spec_matches as f64).min(0.95),
        };
    }

    if trimmed.starts_with("what ") || trimmed.starts_with("is ") || trimmed.starts_with("does ") || trimmed.starts_with("can ") {
        return ClassifiedIntent {
            intent: Intent::SpecLookup,
            confidence: 0.6,
        };
    }

    if keyword::extract_keywords(question).len() == 1 {
        return ClassifiedIntent {
            intent: Intent::SpecLookup,
            confidence: 0.75,
        };
    }

    ClassifiedIntent {
        intent: Intent::SpecLookup,
        confidence: 0.4,
    }
}

fn is_comparison(lower: &str, competitor_names: &[String]) -> bool {
    const TOKENS: &[&str] = &["compare", "versus", "vs", "better than", "difference between"];
    if TOKENS.iter().any(|t| contains_word(lower, t)) {
        return true;
    }
    competitor_names
        .iter()
        .any(|c| lower.contains(&format!("or {}", c.to_lowercase())))
}

/// Resolves an intent from an explicit hint when present, otherwise runs
/// the classifier and applies `threshold` to demote low-confidence results
/// to `Unknown` (§4.4 step 2).
#[must_use]
pub fn resolve(
    question: &str,
    hint: Option<&str>,
    competitor_names: &[String],
    threshold: f64,
) -> ClassifiedIntent {
    if let Some(hint) = hint
        && let Some(intent) = Intent::from_hint(hint)
    {
        return ClassifiedIntent { intent, confidence: 1.0 };
    }

    let classified = classify(question, competitor_names);
    if classified.confidence < threshold {
        return ClassifiedIntent {
            intent: Intent::Unknown,
            confidence: classified.confidence,
        };
    }
    classified
}
