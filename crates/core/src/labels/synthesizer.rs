use std::collections::{BTreeSet, HashMap};

use crate::config::LabelConfig;
use crate::domain::embedding::ItemMetadata;

const TOP_TAGS: usize = 5;
const TOP_CATEGORIES: usize = 3;

/// Label plus the ranked tag/category summaries it was derived from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterProfile {
    pub label: String,
    pub top_tags: Vec<String>,
    pub top_categories: Vec<String>,
    /// Neither a tag nor a category was available; `label` is the fallback.
    pub unlabeled: bool,
}

#[derive(Clone, Debug)]
pub struct LabelSynthesizer {
    stop_tags: BTreeSet<String>,
    max_label_tags: usize,
    overlap_threshold: f64,
    fallback_label: String,
}

impl LabelSynthesizer {
    pub fn new(config: &LabelConfig) -> Self {
        Self {
            stop_tags: config.stop_tags.iter().map(|tag| tag.to_lowercase()).collect(),
            max_label_tags: config.max_label_tags,
            overlap_threshold: config.overlap_threshold,
            fallback_label: config.fallback_label.clone(),
        }
    }

    pub fn synthesize<'a, I>(&self, members: I) -> ClusterProfile
    where
        I: IntoIterator<Item = &'a ItemMetadata>,
    {
        let mut tags = Tally::default();
        let mut categories = Tally::default();

        for item in members {
            for tag in item.tags() {
                if !self.stop_tags.contains(&tag.to_lowercase()) {
                    tags.add(tag);
                }
            }
            if let Some(category) = item.category() {
                categories.add(category);
            }
        }

        let top_tags = tags.most_common(TOP_TAGS);
        let top_categories = categories.most_common(TOP_CATEGORIES);
        let (label, unlabeled) = self.label_for(&top_tags, &top_categories);

        ClusterProfile { label, top_tags, top_categories, unlabeled }
    }

    /// Greedy label over frequency-ranked tags; the first tag of a near-duplicate
    /// family wins.
    pub fn label_for(
        &self,
        ranked_tags: &[String],
        ranked_categories: &[String],
    ) -> (String, bool) {
        let kept = self.distinct_tags(ranked_tags);
        if !kept.is_empty() {
            let formatted: Vec<String> = kept.iter().map(|tag| title_case(tag)).collect();
            return (formatted.join(" & "), false);
        }

        match ranked_categories.first().map(|category| leaf_category(category)) {
            Some(category) if !category.is_empty() => (category.to_string(), false),
            _ => (self.fallback_label.clone(), true),
        }
    }

    fn distinct_tags<'t>(&self, ranked_tags: &'t [String]) -> Vec<&'t str> {
        let mut kept: Vec<&str> = Vec::new();
        let mut kept_normalized: Vec<String> = Vec::new();

        for tag in ranked_tags {
            if kept.len() >= self.max_label_tags {
                break;
            }
            if self.stop_tags.contains(&tag.to_lowercase()) {
                continue;
            }
            let normalized = normalize_tag(tag);
            if normalized.trim().is_empty() {
                continue;
            }
            let duplicate = kept_normalized
                .iter()
                .any(|seen| is_near_duplicate(&normalized, seen, self.overlap_threshold));
            if !duplicate {
                kept.push(tag);
                kept_normalized.push(normalized);
            }
        }

        kept
    }
}

/// Frequency counter that ranks ties by first appearance.
#[derive(Default)]
struct Tally {
    order: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl Tally {
    fn add(&mut self, value: &str) {
        match self.index.get(value) {
            Some(&position) => self.order[position].1 += 1,
            None => {
                self.index.insert(value.to_string(), self.order.len());
                self.order.push((value.to_string(), 1));
            }
        }
    }

    fn most_common(mut self, limit: usize) -> Vec<String> {
        self.order.sort_by(|left, right| right.1.cmp(&left.1));
        self.order.into_iter().take(limit).map(|(value, _)| value).collect()
    }
}

pub(crate) fn normalize_tag(tag: &str) -> String {
    tag.to_lowercase().replace(['-', '_'], " ")
}

/// Equal word sets, substring containment, or a shared-word count reaching
/// `max(1, round(threshold * longer word count))`.
pub(crate) fn is_near_duplicate(candidate: &str, seen: &str, threshold: f64) -> bool {
    let candidate_words: BTreeSet<&str> = candidate.split_whitespace().collect();
    let seen_words: BTreeSet<&str> = seen.split_whitespace().collect();

    if candidate_words == seen_words || candidate.contains(seen) || seen.contains(candidate) {
        return true;
    }

    let shared = candidate_words.intersection(&seen_words).count();
    let longer = candidate_words.len().max(seen_words.len());
    let required = ((threshold * longer as f64).round() as usize).max(1);
    shared >= required
}

/// Last segment of a `>`-delimited category path.
pub fn leaf_category(category: &str) -> &str {
    category.rsplit('>').next().unwrap_or(category).trim()
}

/// Separators become spaces; a letter is upper-cased when it starts a word and
/// lower-cased otherwise.
pub fn title_case(tag: &str) -> String {
    let mut formatted = String::with_capacity(tag.len());
    let mut previous_is_letter = false;

    for character in tag.chars() {
        let character = if character == '-' || character == '_' { ' ' } else { character };
        if character.is_alphabetic() {
            if previous_is_letter {
                formatted.extend(character.to_lowercase());
            } else {
                formatted.extend(character.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            formatted.push(character);
            previous_is_letter = false;
        }
    }

    formatted
}
