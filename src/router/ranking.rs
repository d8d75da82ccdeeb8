//! Fact ranking and filtering (§4.5 "Ranking (facts)" / "Filtering (facts)").

use crate::keyword::Keyword;
use crate::repository::SpecViewRow;

fn combined_text(row: &SpecViewRow) -> String {
    format!("{} {} {}", row.category, row.name, row.value_text).to_lowercase()
}

/// Scores one fact against the extracted `keywords` and the original
/// `question_lower`, per the weighted rules in §4.5.
#[must_use]
pub fn score_fact(row: &SpecViewRow, keywords: &[Keyword], question_lower: &str) -> f64 {
    let category_l = row.category.to_lowercase();
    let name_l = row.name.to_lowercase();
    let value_l = row.value_text.to_lowercase();
    let combined = combined_text(row);

    let non_phrase: Vec<&str> = keywords.iter().filter(|k| !k.is_phrase()).map(Keyword::text).collect();
    let phrase_kws: Vec<&str> = keywords.iter().filter(|k| k.is_phrase()).map(Keyword::text).collect();

    let mut score = row.confidence;
    let mut name_match_count = 0usize;
    let mut category_matched = false;
    let mut name_matched = false;
    let mut matched_count = 0usize;

    for kw in &non_phrase {
        let in_category = category_l.contains(kw);
        let in_name = name_l.contains(kw);
        let in_value = value_l.contains(kw);
        if in_category || in_name {
            score += 2.0;
            matched_count += 1;
            category_matched |= in_category;
            if in_name {
                name_matched = true;
                name_match_count += 1;
            }
        } else if in_value {
            score += 0.5;
            matched_count += 1;
        }
    }
    if name_match_count > 1 {
        #[allow(clippy::cast_precision_loss)]
        let extra = (name_match_count - 1) as f64;
        score += 1.5 * extra;
    }
    if category_matched && name_matched {
        score += 1.0;
    }

    for phrase in &phrase_kws {
        if name_l.contains(phrase) {
            score += 5.0;
        } else if category_l.contains(phrase) {
            score += 4.0;
        } else if combined.contains(phrase) {
            score += 3.0;
        }
    }

    let question_words: Vec<&str> = question_lower.split_whitespace().collect();
    if question_words.windows(2).any(|w| combined.contains(&w.join(" "))) {
        score += 4.0;
    }

    let co_occurring = non_phrase.iter().filter(|kw| combined.contains(**kw)).count();
    if co_occurring >= 2 {
        score += 1.0;
    }

    if non_phrase.len() >= 2 {
        if matched_count == 0 {
            score *= 0.05;
        } else if matched_count == non_phrase.len() {
            score += 10.0;
        } else {
            #[allow(clippy::cast_precision_loss)]
            let ratio = matched_count as f64 / non_phrase.len() as f64;
            if non_phrase.len() == 2 {
                score *= 0.1;
            } else if ratio < 0.5 {
                score *= 0.2;
            } else {
                score *= 0.5;
            }
        }
    }

    score
}

fn is_color_query(keywords: &[Keyword]) -> bool {
    keywords.iter().any(|k| matches!(k.text(), "color" | "colors" | "colour" | "colours"))
}

/// The maximum number of facts to keep after ranking, per §4.5's cap table.
#[must_use]
pub fn result_cap(keywords: &[Keyword]) -> usize {
    if is_color_query(keywords) {
        return 100;
    }
    let non_phrase_count = keywords.iter().filter(|k| !k.is_phrase()).count();
    match non_phrase_count {
        2 => 5,
        n if n >= 3 => 60,
        _ => 30,
    }
}

fn matches_requirement(row: &SpecViewRow, keywords: &[Keyword]) -> bool {
    let combined = combined_text(row);
    let non_phrase: Vec<&str> = keywords.iter().filter(|k| !k.is_phrase()).map(Keyword::text).collect();
    let phrase_kws: Vec<&str> = keywords.iter().filter(|k| k.is_phrase()).map(Keyword::text).collect();

    for phrase in &phrase_kws {
        if !combined.contains(phrase) {
            return false;
        }
    }

    match non_phrase.len() {
        0 | 1 => true,
        2 => non_phrase.iter().all(|kw| combined.contains(kw)),
        _ => non_phrase.iter().any(|kw| combined.contains(kw)),
    }
}

/// Ranks, filters, and caps facts per §4.5. Ties in score are broken by
/// ascending `spec_value_id` for determinism (Open Question resolution, see
/// `DESIGN.md`).
#[must_use]
pub fn rank_filter_and_cap(
    rows: Vec<SpecViewRow>,
    keywords: &[Keyword],
    question_lower: &str,
) -> Vec<(SpecViewRow, f64)> {
    let mut scored: Vec<(SpecViewRow, f64)> = rows
        .into_iter()
        .map(|row| {
            let score = score_fact(&row, keywords, question_lower);
            (row, score)
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.spec_value_id.cmp(&b.0.spec_value_id))
    });

    let total = scored.len();
    let mut filtered: Vec<(SpecViewRow, f64)> =
        scored.iter().filter(|(row, _)| matches_requirement(row, keywords)).cloned().collect();

    if total > 0 {
        let removed_fraction = 1.0 - (filtered.len() as f64 / total as f64);
        if removed_fraction > 2.0 / 3.0 {
            let relaxed: Vec<(SpecViewRow, f64)> = scored
                .iter()
                .filter(|(_, score)| *score >= 0.5)
                .cloned()
                .collect();
            filtered = if relaxed.is_empty() {
                scored.iter().take(10).cloned().collect()
            } else {
                relaxed
            };
        }
    }

    let cap = result_cap(keywords);
    filtered.truncate(cap);
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CampaignVariantId, ProductId, SpecValueId, TenantId};

    fn row(category: &str, name: &str, value: &str, confidence: f64) -> SpecViewRow {
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
            confidence,
            source_doc: None,
            source_page: None,
        }
    }

    #[test]
    fn s2_color_query_caps_at_100_and_keeps_spelling_variants() {
        let keywords = crate::keyword::extract_keywords("what colours are available");
        let rows: Vec<SpecViewRow> = (0..120)
            .map(|i| row("Exterior", "Body Color", &format!("Color {i}"), 0.8))
            .collect();
        let result = rank_filter_and_cap(rows, &keywords, "what colours are available");
        assert!(result.len() <= 100);
        assert!(!result.is_empty());
    }

    #[test]
    fn s3_focused_two_keyword_caps_at_five_and_requires_both() {
        let keywords = crate::keyword::extract_keywords("child seat");
        let mut rows = vec![row("Safety", "Child Seat Anchors", "ISOFIX", 0.9)];
        for i in 0..49 {
            rows.push(row("Exterior", "Paint", &format!("Shade {i}"), 0.5));
        }
        let result = rank_filter_and_cap(rows, &keywords, "child seat");
        assert!(result.len() <= 5);
        for (r, _) in &result {
            let combined = combined_text(r);
            assert!(combined.contains("child") || combined.contains("seat"));
        }
    }

    #[test]
    fn empty_filter_falls_back_to_top_ten_raw_score() {
        let keywords = crate::keyword::extract_keywords("turbocharger intercooler ducting");
        let rows = vec![row("Exterior", "Paint", "Red", 0.5), row("Exterior", "Wheels", "18in", 0.4)];
        let result = rank_filter_and_cap(rows, &keywords, "turbocharger intercooler ducting");
        assert!(result.len() <= 10);
    }

    #[test]
    fn ties_break_on_ascending_spec_value_id() {
        let keywords = crate::keyword::extract_keywords("engine");
        let mut a = row("Engine", "Displacement", "2.0L", 0.5);
        let mut b = row("Engine", "Displacement", "2.0L", 0.5);
        if a.spec_value_id > b.spec_value_id {
            std::mem::swap(&mut a, &mut b);
        }
        let rows = vec![b.clone(), a.clone()];
        let result = rank_filter_and_cap(rows, &keywords, "engine");
        assert_eq!(result[0].0.spec_value_id, a.spec_value_id);
    }
}
