//! Synonym-based canonicalization of model, storage, and condition text.
//!
//! Matching is "first containment wins" over tables sorted by descending
//! synonym length, so a longer, more specific spelling always beats a short
//! one that happens to be its substring.

use std::collections::HashMap;

use crate::config::SynonymConfig;
use crate::model::ConditionTier;

/// Lowercase, then keep only ASCII digits, lowercase Latin letters, and
/// Hangul syllables. Used for model/storage text and keyword matching.
pub fn normalize_identity_text(value: &str) -> String {
    value
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| {
            c.is_ascii_digit() || c.is_ascii_lowercase() || ('\u{ac00}'..='\u{d7a3}').contains(c)
        })
        .collect()
}

/// Lowercase and strip whitespace only. Condition phrases keep punctuation
/// (e.g. "고장/파손") so unrelated character classes stay distinguishing.
pub fn normalize_condition_text(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// `1tb` formats as "1TB"; anything with digits becomes "<digits>GB";
/// otherwise the value is uppercased as-is.
pub fn format_storage_label(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    if value.eq_ignore_ascii_case("1tb") {
        return "1TB".to_string();
    }
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        value.to_uppercase()
    } else {
        format!("{digits}GB")
    }
}

/// `galaxy_s24_ultra` -> "Galaxy S24 Ultra".
pub fn humanize_model(canonical: &str) -> String {
    canonical
        .split('_')
        .filter(|token| !token.is_empty())
        .map(|token| {
            let mut chars = token.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ordered `(normalized synonym, canonical value)` pairs, longest first.
#[derive(Debug, Clone)]
pub struct SynonymTable {
    entries: Vec<(String, String)>,
}

impl SynonymTable {
    fn from_entries(mut entries: Vec<(String, String)>) -> Self {
        entries.sort_by(|a, b| {
            b.0.chars()
                .count()
                .cmp(&a.0.chars().count())
                .then_with(|| a.0.cmp(&b.0))
                .then_with(|| a.1.cmp(&b.1))
        });
        entries.dedup();
        Self { entries }
    }

    fn build(
        source: &HashMap<String, Vec<String>>,
        normalize: fn(&str) -> String,
        include_canonical: bool,
    ) -> Self {
        let mut entries = Vec::new();
        for (canonical, synonyms) in source {
            for synonym in synonyms {
                let normalized = normalize(synonym);
                if !normalized.is_empty() {
                    entries.push((normalized, canonical.clone()));
                }
            }
            if include_canonical {
                let normalized = normalize(canonical);
                if !normalized.is_empty() {
                    entries.push((normalized, canonical.clone()));
                }
            }
        }
        Self::from_entries(entries)
    }

    /// Canonical value of the first entry contained in the (already
    /// normalized) input.
    fn lookup(&self, normalized: &str) -> Option<&str> {
        if normalized.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(synonym, _)| normalized.contains(synonym.as_str()))
            .map(|(_, canonical)| canonical.as_str())
    }
}

/// Plain-number capacities tried against raw title/description text when the
/// storage synonym table finds nothing. Checked largest-first.
const STORAGE_FALLBACK: [(&str, &str); 5] = [
    ("512", "512g"),
    ("256", "256g"),
    ("128", "128g"),
    ("64", "64g"),
    ("32", "32g"),
];

#[derive(Debug, Clone)]
pub struct Normalizer {
    model_table: SynonymTable,
    storage_table: SynonymTable,
    condition_table: SynonymTable,
    condition_labels: HashMap<String, ConditionTier>,
    condition_groups: HashMap<ConditionTier, Vec<String>>,
    keyword_pairs: Vec<(String, String)>,
    exclude_keywords: Vec<String>,
    platforms: Vec<String>,
}

impl Normalizer {
    pub fn new(config: &SynonymConfig) -> Self {
        let model_table = SynonymTable::build(&config.model_synonyms, normalize_identity_text, true);
        let storage_table =
            SynonymTable::build(&config.storage_synonyms, normalize_identity_text, true);

        // The condition table maps free-text descriptions AND the canonical
        // labels themselves onto a tier key, so label spellings with uneven
        // spacing still resolve.
        let mut condition_entries = Vec::new();
        let mut condition_labels = HashMap::new();
        let mut condition_groups = HashMap::new();
        for (key, labels) in &config.condition_groups {
            let Some(tier) = ConditionTier::from_key(&normalize_condition_text(key)) else {
                continue;
            };
            for label in labels {
                let normalized = normalize_condition_text(label);
                if normalized.is_empty() {
                    continue;
                }
                condition_entries.push((normalized.clone(), tier.as_key().to_string()));
                condition_labels.insert(normalized, tier);
            }
            condition_groups.insert(tier, labels.clone());
        }
        for (key, synonyms) in &config.condition_synonyms {
            if ConditionTier::from_key(&normalize_condition_text(key)).is_none() {
                continue;
            }
            let tier_key = normalize_condition_text(key);
            for synonym in synonyms {
                let normalized = normalize_condition_text(synonym);
                if !normalized.is_empty() {
                    condition_entries.push((normalized, tier_key.clone()));
                }
            }
        }
        let condition_table = SynonymTable::from_entries(condition_entries);

        Self {
            model_table,
            storage_table,
            condition_table,
            condition_labels,
            condition_groups,
            keyword_pairs: config.keyword_pairs.clone(),
            exclude_keywords: config.exclude_keywords.clone(),
            platforms: config.platforms.clone(),
        }
    }

    pub fn canonicalize_model(&self, text: &str) -> Option<String> {
        self.model_table
            .lookup(&normalize_identity_text(text))
            .map(str::to_string)
    }

    pub fn canonicalize_storage(&self, text: &str) -> Option<String> {
        self.storage_table
            .lookup(&normalize_identity_text(text))
            .map(str::to_string)
    }

    /// Synonym-table match first, then the plain-number fallback.
    pub fn resolve_storage(&self, text: &str) -> Option<String> {
        self.canonicalize_storage(text)
            .or_else(|| self.infer_storage_from_text(&[text]))
    }

    pub fn canonicalize_condition(&self, text: &str) -> Option<ConditionTier> {
        let normalized = normalize_condition_text(text);
        if normalized.is_empty() {
            return None;
        }
        if let Some(tier) = ConditionTier::from_key(&normalized) {
            return Some(tier);
        }
        if let Some(tier) = self.condition_labels.get(&normalized) {
            return Some(*tier);
        }
        self.condition_table
            .lookup(&normalized)
            .and_then(ConditionTier::from_key)
    }

    /// The disjoint canonical-label group behind a tier, for callers that
    /// build storage-side queries (`condition IN (...)`).
    pub fn expand_tier(&self, tier: ConditionTier) -> &[String] {
        self.condition_groups
            .get(&tier)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn condition_groups(&self) -> &HashMap<ConditionTier, Vec<String>> {
        &self.condition_groups
    }

    /// Parses the request-side condition parameter: one or a comma-separated
    /// list of tier letters or canonical labels. Unknown entries are skipped
    /// (fall back to "no filter"), never an error.
    pub fn parse_condition_param(&self, raw: &str) -> Vec<ConditionTier> {
        let mut tiers = Vec::new();
        for part in raw.split(',') {
            if let Some(tier) = self.canonicalize_condition(part) {
                if !tiers.contains(&tier) {
                    tiers.push(tier);
                }
            }
        }
        tiers
    }

    /// Korean -> Latin keyword replacements followed by identity
    /// normalization, so "갤럭시 S24" and "galaxy s24" compare equal.
    pub fn fold_keyword(&self, text: &str) -> String {
        let mut folded = text.to_lowercase();
        for (needle, replacement) in &self.keyword_pairs {
            folded = folded.replace(needle.as_str(), replacement.as_str());
        }
        normalize_identity_text(&folded)
    }

    /// Searches raw (non-normalized) text for standalone capacity numbers.
    /// "1256" must not match "256", so both digit neighbours are checked.
    pub fn infer_storage_from_text(&self, texts: &[&str]) -> Option<String> {
        for raw in texts {
            let lowered = raw.to_lowercase();
            for (needle, canonical) in STORAGE_FALLBACK {
                if contains_standalone_number(&lowered, needle) {
                    return Some(canonical.to_string());
                }
            }
            let folded = normalize_identity_text(&lowered);
            if folded.contains("1tb") || folded.contains("1테라") || lowered.contains("1 tb") {
                return Some("1tb".to_string());
            }
        }
        None
    }

    pub fn exclude_keywords(&self) -> &[String] {
        &self.exclude_keywords
    }

    pub fn platforms(&self) -> &[String] {
        &self.platforms
    }
}

fn contains_standalone_number(haystack: &str, needle: &str) -> bool {
    let bytes = haystack.as_bytes();
    let mut offset = 0;
    while let Some(pos) = haystack[offset..].find(needle) {
        let start = offset + pos;
        let end = start + needle.len();
        let digit_before = start > 0 && bytes[start - 1].is_ascii_digit();
        let digit_after = end < bytes.len() && bytes[end].is_ascii_digit();
        if !digit_before && !digit_after {
            return true;
        }
        offset = start + 1;
    }
    false
}
