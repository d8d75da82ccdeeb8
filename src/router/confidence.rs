//! `KeywordConfidence` and `OverallConfidence` (§4.6).

use crate::keyword::Keyword;
use crate::repository::SpecViewRow;

/// `KeywordConfidence(facts, query)`: a heuristic score guiding whether
/// vector fallback is needed.
#[must_use]
pub fn keyword_confidence(facts: &[SpecViewRow], keywords: &[Keyword], question_lower: &str) -> f64 {
    if facts.is_empty() {
        return 0.0;
    }

    let mut exact = 0usize;
    let mut partial = 0usize;

    for fact in facts {
        let combined = format!("{} {} {}", fact.category, fact.name, fact.value_text).to_lowercase();
        let non_phrase: Vec<&str> = keywords.iter().filter(|k| !k.is_phrase()).map(Keyword::text).collect();
        if non_phrase.is_empty() {
            continue;
        }
        let matched = non_phrase.iter().filter(|kw| combined.contains(**kw)).count();
        if matched == non_phrase.len() {
            exact += 1;
        } else if matched > 0 {
            partial += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let mut score = exact as f64 * 0.3 + partial as f64 * 0.1;

    let keyword_count = keywords.len();
    let complexity_bonus = if keyword_count <= 2 {
        0.2
    } else if keyword_count > 4 {
        -0.1
    } else {
        0.0
    };
    score += complexity_bonus;

    let has_relevant_matches = exact > 0 || partial > 0;
    if has_relevant_matches {
        #[allow(clippy::cast_precision_loss)]
        let count_bonus = (facts.len() as f64 * 0.05).min(5.0 * 0.05);
        score += count_bonus;
    }

    #[allow(clippy::cast_precision_loss)]
    let relevance_ratio = partial as f64;
    if exact == 0 && relevance_ratio < 0.5 {
        score = score.min(0.65);
    }

    if facts.len() > 10 && !has_relevant_matches {
        score *= 0.8;
    }

    score.clamp(0.0, 1.0)
}

/// `OverallConfidence(resp)`: weighted blend of the best structured fact
/// confidence and the mean semantic score (already normalized to `[0, 1]`).
#[must_use]
pub fn overall_confidence(max_fact_confidence: Option<f64>, mean_semantic_score: Option<f64>) -> f64 {
    match (max_fact_confidence, mean_semantic_score) {
        (Some(f), Some(s)) => (0.6 * f + 0.4 * s).clamp(0.0, 1.0),
        (Some(f), None) => f.clamp(0.0, 1.0),
        (None, Some(s)) => s.clamp(0.0, 1.0),
        (None, None) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CampaignVariantId, ProductId, SpecValueId, TenantId};

    fn row(category: &str, name: &str, value: &str) -> SpecViewRow {
        SpecViewRow {
            spec_value_id: SpecValueId::new(),
            tenant_id: TenantId::new(),
            product_id: ProductId::new(),
            campaign_variant_id: CampaignVariantId::new(),
            category: category.to_string(),
            name: name.to_string(),
            value_text: value.to_string(),
            value_numeric: None,
            unit: None,
            confidence: 0.9,
            source_doc: None,
            source_page: None,
        }
    }

    #[test]
    fn empty_facts_is_zero_confidence() {
        assert_eq!(keyword_confidence(&[], &[], ""), 0.0);
    }

    #[test]
    fn exact_match_raises_confidence() {
        let keywords = crate::keyword::extract_keywords("horsepower");
        let facts = vec![row("Engine", "Horsepower", "200 hp")];
        let conf = keyword_confidence(&facts, &keywords, "horsepower");
        assert!(conf > 0.0);
    }

    #[test]
    fn overall_confidence_blends_both_signals() {
        let c = overall_confidence(Some(0.9), Some(0.5));
        assert!((0.5..=0.9).contains(&c));
    }

    #[test]
    fn overall_confidence_falls_back_to_single_signal() {
        assert!((overall_confidence(Some(0.8), None) - 0.8).abs() < 1e-9);
        assert!((overall_confidence(None, Some(0.3)) - 0.3).abs() < 1e-9);
        assert_eq!(overall_confidence(None, None), 0.0);
    }

    #[test]
    fn clamped_to_unit_interval() {
        assert!(keyword_confidence(&[row("a", "b", "c")], &[], "") <= 1.0);
    }
}
