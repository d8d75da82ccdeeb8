//! Hierarchical grouping of `spec_row` chunks by category/sub-category (§4.7).

use super::SemanticChunkResult;
use crate::model::ChunkType;

const UNCATEGORIZED: &str = "Uncategorized";
const GENERAL: &str = "General";

/// Partitions `results` into `{spec_row, other}`, groups `spec_row` entries
/// by `(parent_category, sub_category)` in ascending lexicographic order,
/// and appends non-`spec_row` entries after all groups. Within a group,
/// chunks retain their incoming (ranked) order.
#[must_use]
pub fn apply(results: Vec<SemanticChunkResult>) -> Vec<SemanticChunkResult> {
    let has_spec_row = results.iter().any(|r| r.chunk_type == ChunkType::SpecRow);
    if !has_spec_row {
        return results;
    }

    let (spec_rows, other): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.chunk_type == ChunkType::SpecRow);

    let mut keys: Vec<(String, String)> = spec_rows
        .iter()
        .map(|r| {
            (
                r.parent_category.clone().filter(|s| !s.is_empty()).unwrap_or_else(|| UNCATEGORIZED.to_string()),
                r.sub_category.clone().filter(|s| !s.is_empty()).unwrap_or_else(|| GENERAL.to_string()),
            )
        })
        .collect();
    keys.sort();
    keys.dedup();

    let mut grouped = Vec::with_capacity(spec_rows.len() + other.len());
    for (parent, sub) in keys {
        for r in &spec_rows {
            let r_parent = r.parent_category.clone().filter(|s| !s.is_empty()).unwrap_or_else(|| UNCATEGORIZED.to_string());
            let r_sub = r.sub_category.clone().filter(|s| !s.is_empty()).unwrap_or_else(|| GENERAL.to_string());
            if r_parent == parent && r_sub == sub {
                grouped.push(r.clone());
            }
        }
    }

    grouped.extend(other);
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Visibility;

    fn chunk(parent: &str, sub: &str) -> SemanticChunkResult {
        SemanticChunkResult {
            chunk_id: crate::model::ChunkId::new(),
            chunk_type: ChunkType::SpecRow,
            text: format!("{parent}/{sub}"),
            score: 0.9,
            parent_category: Some(parent.to_string()),
            sub_category: Some(sub.to_string()),
            specification_type: None,
            value: None,
            parsed_spec_ids: vec![],
            visibility: Visibility::TenantOnly,
        }
    }

    #[test]
    fn s5_groups_in_ascending_parent_then_sub_order() {
        let results = vec![
            chunk("Exterior", "Colors"),
            chunk("Engine", "Torque"),
            chunk("Exterior", "Wheels"),
        ];
        let grouped = apply(results);
        let order: Vec<(String, String)> = grouped
            .iter()
            .map(|r| (r.parent_category.clone().unwrap(), r.sub_category.clone().unwrap()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Engine".to_string(), "Torque".to_string()),
                ("Exterior".to_string(), "Colors".to_string()),
                ("Exterior".to_string(), "Wheels".to_string()),
            ]
        );
    }

    #[test]
    fn empty_category_defaults_to_uncategorized_general() {
        let mut c = chunk("", "");
        c.parent_category = None;
        c.sub_category = None;
        let grouped = apply(vec![c]);
        assert_eq!(grouped[0].parent_category.as_deref(), None);
    }

    #[test]
    fn non_spec_row_chunks_appended_after_groups() {
        let mut other = chunk("Engine", "Torque");
        other.chunk_type = ChunkType::Global;
        other.parent_category = None;
        let results = vec![other.clone(), chunk("Engine", "Torque")];
        let grouped = apply(results);
        assert_eq!(grouped.last().unwrap().chunk_type, ChunkType::Global);
    }

    #[test]
    fn no_spec_row_present_leaves_order_unchanged() {
        let mut a = chunk("Engine", "Torque");
        a.chunk_type = ChunkType::Global;
        let mut b = chunk("Exterior", "Colors");
        b.chunk_type = ChunkType::Usp;
        let results = vec![a.clone(), b.clone()];
        let grouped = apply(results.clone());
        assert_eq!(grouped, results);
    }
}
