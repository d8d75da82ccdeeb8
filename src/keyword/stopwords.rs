//! The closed stop-word set (§4.2): articles, auxiliaries, interrogatives,
//! pronouns, plus domain-generic tokens that carry no discriminating signal
//! in a product-brochure question.

use std::collections::HashSet;
use std::sync::LazyLock;

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // articles
        "a", "an", "the",
        // auxiliaries
        "is", "are", "was", "were", "be", "been", "being", "do", "does", "did", "can", "could", "will", "would",
        "shall", "should", "may", "might", "must", "have", "has", "had",
        // interrogatives
        "what", "how", "why", "when", "where", "which", "who", "whom",
        // pronouns
        "it", "its", "i", "me", "my", "you", "your", "yours", "they", "them", "their", "this", "that", "these",
        "those", "he", "she", "him", "her",
        // conjunctions/prepositions
        "and", "or", "of", "in", "on", "at", "to", "for", "with", "about", "as", "by", "from",
        // domain-generic
        "car", "vehicle", "system", "type", "size", "model", "please", "tell", "me",
    ]
    .into_iter()
    .collect()
});

/// True if `word` (already lowercased) is in the closed stop-word set.
#[must_use]
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_articles_and_interrogatives() {
        assert!(is_stop_word("the"));
        assert!(is_stop_word("what"));
        assert!(is_stop_word("vehicle"));
    }

    #[test]
    fn does_not_flag_content_words() {
        assert!(!is_stop_word("horsepower"));
        assert!(!is_stop_word("color"));
    }
}
