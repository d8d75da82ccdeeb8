//! Curated multi-word phrases (§4.2) detected directly against the
//! lowercased question text, independent of tokenization.

/// Phrases worth preserving as a single keyword rather than being split into
/// (and possibly stop-word-filtered) individual tokens.
pub const CURATED_PHRASES: &[&str] = &[
    "sound system",
    "audio system",
    "climate control",
    "safety rating",
    "safety features",
    "brake system",
    "braking system",
    "suspension system",
    "fuel economy",
    "fuel efficiency",
    "fuel type",
    "fuel consumption",
    "child seat",
    "child safety seat",
    "body color",
    "body colour",
    "exterior color",
    "exterior colour",
    "interior color",
    "interior colour",
    "towing capacity",
    "cargo capacity",
    "ground clearance",
    "warranty coverage",
    "infotainment system",
    "navigation system",
    "driver assistance",
];

/// Returns curated phrases that appear as a contiguous substring of
/// `lowercased_question`, skipping any phrase already covered by
/// `already_covered` (quoted phrases take precedence).
#[must_use]
pub fn detect_phrases(lowercased_question: &str, already_covered: &[String]) -> Vec<String> {
    CURATED_PHRASES
        .iter()
        .filter(|p| lowercased_question.contains(*p))
        .filter(|p| !already_covered.iter().any(|c| c == *p))
        .map(|p| (*p).to_string())
        .collect()
}
