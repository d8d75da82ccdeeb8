//! `NormalizeSpecName` (§4.2): maps a free-form spec label to a canonical
//! name plus alternatives via three lookup tables.

use std::collections::HashMap;

/// Result of normalizing a free-form spec label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSpecName {
    /// Canonical spec name, e.g. `"Horsepower"`.
    pub canonical: String,
    /// Category the canonical name falls under, e.g. `"Engine"`.
    pub category: String,
    /// Known alternative/variant names for the canonical spec.
    pub alternatives: Vec<String>,
}

/// (a) canonical→variants, (b) variant→canonical inverse, (c) name→category.
pub struct SpecNormalizer {
    canonical_to_variants: HashMap<String, Vec<String>>,
    variant_to_canonical: HashMap<String, String>,
    name_to_category: HashMap<String, String>,
}

impl Default for SpecNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecNormalizer {
    /// Builds the normalizer with its curated alias tables.
    #[must_use]
    pub fn new() -> Self {
        let entries: &[(&str, &str, &[&str])] = &[
            ("Horsepower", "Engine", &["hp", "bhp", "power output", "power"]),
            ("Torque", "Engine", &["lb-ft", "newton meters", "nm"]),
            ("Fuel Economy", "Fuel", &["mileage", "mpg", "fuel efficiency", "gas mileage"]),
            ("Fuel Type", "Fuel", &["gas type", "fuel grade"]),
            ("Body Color", "Exterior", &["color", "colour", "paint color", "exterior color", "exterior colour"]),
            ("Wheels", "Exterior", &["rims", "wheel size"]),
            ("Towing Capacity", "Capability", &["tow rating", "towing"]),
            ("Cargo Capacity", "Capability", &["trunk space", "cargo space"]),
            ("Ground Clearance", "Capability", &["clearance"]),
            ("Safety Rating", "Safety", &["crash rating", "safety score"]),
            ("Child Seat Compatibility", "Safety", &["child seat", "car seat compatibility"]),
            ("Brake System", "Safety", &["brakes", "braking system"]),
            ("Suspension", "Ride & Handling", &["suspension system", "shocks"]),
            ("Sound System", "Infotainment", &["audio system", "speakers", "stereo"]),
            ("Navigation System", "Infotainment", &["nav system", "gps"]),
            ("Climate Control", "Comfort", &["air conditioning", "ac", "hvac"]),
            ("Warranty", "Ownership", &["warranty coverage", "warranty period"]),
        ];

        let mut canonical_to_variants = HashMap::new();
        let mut variant_to_canonical = HashMap::new();
        let mut name_to_category = HashMap::new();

        for (canonical, category, variants) in entries {
            let variants: Vec<String> = variants.iter().map(|v| (*v).to_string()).collect();
            variant_to_canonical.insert(canonical.to_lowercase(), (*canonical).to_string());
            for v in &variants {
                variant_to_canonical.insert(v.to_lowercase(), (*canonical).to_string());
            }
            name_to_category.insert((*canonical).to_string(), (*category).to_string());
            canonical_to_variants.insert((*canonical).to_string(), variants);
        }

        Self {
            canonical_to_variants,
            variant_to_canonical,
            name_to_category,
        }
    }

    /// Normalizes a free-form spec label. Unknown names are title-cased and
    /// categorized as `General` unless a known category name appears as a
    /// substring of the input.
    #[must_use]
    pub fn normalize(&self, name: &str) -> NormalizedSpecName {
        let lower = name.trim().to_lowercase();

        if let Some(canonical) = self.variant_to_canonical.get(&lower) {
            let category = self
                .name_to_category
                .get(canonical)
                .cloned()
                .unwrap_or_else(|| "General".to_string());
            let alternatives = self.canonical_to_variants.get(canonical).cloned().unwrap_or_default();
            return NormalizedSpecName {
                canonical: canonical.clone(),
                category,
                alternatives,
            };
        }

        let canonical = title_case(&lower);
        let category = self
            .name_to_category
            .iter()
            .find(|(_, cat)| lower.contains(&cat.to_lowercase()))
            .map(|(_, cat)| cat.clone())
            .unwrap_or_else(|| "General".to_string());

        NormalizedSpecName {
            canonical,
            category,
            alternatives: vec![],
        }
    }
}

fn title_case(lower: &str) -> String {
    lower
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_variant_to_canonical() {
        let normalizer = SpecNormalizer::new();
        let result = normalizer.normalize("mpg");
        assert_eq!(result.canonical, "Fuel Economy");
        assert_eq!(result.category, "Fuel");
        assert!(result.alternatives.contains(&"mileage".to_string()));
    }

    #[test]
    fn normalizes_colour_variant_same_as_color() {
        let normalizer = SpecNormalizer::new();
        assert_eq!(normalizer.normalize("colour").canonical, normalizer.normalize("color").canonical);
    }

    #[test]
    fn unknown_name_is_title_cased_and_general() {
        let normalizer = SpecNormalizer::new();
        let result = normalizer.normalize("trunk liner material");
        assert_eq!(result.canonical, "Trunk Liner Material");
        assert_eq!(result.category, "General");
    }

    #[test]
    fn unknown_name_substring_matches_category() {
        let normalizer = SpecNormalizer::new();
        let result = normalizer.normalize("engine block material");
        // "engine" isn't itself a category name in the table, falls back to General
        // unless a category name is literally a substring.
        assert_eq!(result.category, "General");
    }

    #[test]
    fn normalization_is_idempotent() {
        let normalizer = SpecNormalizer::new();
        let once = normalizer.normalize("mpg");
        let twice = normalizer.normalize(&once.canonical);
        assert_eq!(once, twice);
    }

    #[test]
    fn idempotent_for_unknown_names_too() {
        let normalizer = SpecNormalizer::new();
        let once = normalizer.normalize("trunk liner material");
        let twice = normalizer.normalize(&once.canonical);
        assert_eq!(once, twice);
    }
}
