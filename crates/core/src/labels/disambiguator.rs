use std::collections::{HashMap, HashSet};

use crate::config::LabelConfig;
use crate::domain::cluster::Cluster;
use crate::labels::synthesizer::{leaf_category, title_case};

/// Tags at these ranks in `top_tags` are never part of the base label.
const EXTRA_TAG_RANKS: std::ops::Range<usize> = 2..5;

#[derive(Clone, Debug)]
pub struct LabelDisambiguator {
    max_suffix_len: usize,
}

impl LabelDisambiguator {
    pub fn new(config: &LabelConfig) -> Self {
        Self { max_suffix_len: config.max_suffix_len }
    }

    /// Rewrites colliding labels in place so every label is unique. Clusters are
    /// visited in slice order; labels that are already unique are left untouched.
    /// Returns the number of labels changed.
    pub fn disambiguate(&self, clusters: &mut [Cluster]) -> usize {
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();
        for (position, cluster) in clusters.iter().enumerate() {
            match group_index.get(&cluster.label) {
                Some(&group) => groups[group].1.push(position),
                None => {
                    group_index.insert(cluster.label.clone(), groups.len());
                    groups.push((cluster.label.clone(), vec![position]));
                }
            }
        }

        let mut used: HashSet<String> = groups
            .iter()
            .filter(|(_, members)| members.len() == 1)
            .map(|(label, _)| label.clone())
            .collect();

        let mut changed = 0;
        for (label, members) in groups.iter().filter(|(_, members)| members.len() > 1) {
            for (rank, &position) in members.iter().enumerate() {
                let cluster = &clusters[position];
                let chosen = self
                    .category_suffix(label, cluster, &used)
                    .or_else(|| tag_suffix(label, cluster, &used))
                    .unwrap_or_else(|| numbered(label, rank == 0, &used));

                if chosen != *label {
                    changed += 1;
                }
                used.insert(chosen.clone());
                clusters[position].label = chosen;
            }
        }

        if changed > 0 {
            tracing::debug!(
                event_name = "labels.disambiguated",
                changed,
                "cluster labels made unique"
            );
        }
        changed
    }

    fn category_suffix(
        &self,
        label: &str,
        cluster: &Cluster,
        used: &HashSet<String>,
    ) -> Option<String> {
        let lowered = label.to_lowercase();
        cluster
            .top_categories
            .iter()
            .map(|category| leaf_category(category))
            .filter(|category| !category.is_empty())
            .filter(|category| category.chars().count() < self.max_suffix_len)
            .filter(|category| !lowered.contains(&category.to_lowercase()))
            .map(|category| format!("{label}: {category}"))
            .find(|candidate| !used.contains(candidate))
    }
}

fn tag_suffix(label: &str, cluster: &Cluster, used: &HashSet<String>) -> Option<String> {
    let lowered = label.to_lowercase();
    cluster
        .top_tags
        .iter()
        .skip(EXTRA_TAG_RANKS.start)
        .take(EXTRA_TAG_RANKS.len())
        .map(|tag| title_case(tag))
        .filter(|tag| !tag.trim().is_empty() && !lowered.contains(&tag.to_lowercase()))
        .map(|tag| format!("{label}: {tag}"))
        .find(|candidate| !used.contains(candidate))
}

fn numbered(label: &str, first: bool, used: &HashSet<String>) -> String {
    if first && !used.contains(label) {
        return label.to_string();
    }
    (2..)
        .map(|number| format!("{label} #{number}"))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| format!("{label} #{}", used.len() + 2))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::LabelDisambiguator;
    use crate::config::LabelConfig;
    use crate::domain::cluster::Cluster;

    fn cluster(id: usize, label: &str, tags: &[&str], categories: &[&str]) -> Cluster {
        Cluster {
            id,
            label: label.to_owned(),
            top_tags: tags.iter().map(|tag| (*tag).to_owned()).collect(),
            top_categories: categories.iter().map(|category| (*category).to_owned()).collect(),
            item_count: 10 - id,
            sample_items: Vec::new(),
            member_items: Vec::new(),
        }
    }

    fn disambiguator() -> LabelDisambiguator {
        LabelDisambiguator::new(&LabelConfig::default())
    }

    #[test]
    fn unique_labels_are_untouched() {
        let mut clusters =
            vec![cluster(0, "Pricing", &[], &["Pricing"]), cluster(1, "Auctions", &[], &[])];
        assert_eq!(disambiguator().disambiguate(&mut clusters), 0);
        assert_eq!(clusters[0].label, "Pricing");
        assert_eq!(clusters[1].label, "Auctions");
    }

    #[test]
    fn category_suffix_is_preferred() {
        let mut clusters = vec![
            cluster(0, "Causal Inference", &[], &["Causal Inference", "Economics > Health"]),
            cluster(1, "Causal Inference", &[], &["Marketing"]),
        ];
        disambiguator().disambiguate(&mut clusters);

        assert_eq!(clusters[0].label, "Causal Inference: Health");
        assert_eq!(clusters[1].label, "Causal Inference: Marketing");
    }

    #[test]
    fn extra_tags_are_used_when_categories_do_not_help() {
        let mut clusters = vec![
            cluster(0, "Pricing", &["pricing", "auctions", "dynamic-pricing"], &[]),
            cluster(
                1,
                "Pricing",
                &["pricing", "auctions"],
                &["A category too long to use as a suffix"],
            ),
        ];
        disambiguator().disambiguate(&mut clusters);

        assert_eq!(clusters[0].label, "Pricing: Dynamic Pricing");
        assert_eq!(clusters[1].label, "Pricing #2");
    }

    #[test]
    fn numeric_suffix_skips_taken_numbers() {
        let mut clusters = vec![
            cluster(0, "Careers", &[], &[]),
            cluster(1, "Careers", &[], &[]),
            cluster(2, "Careers #2", &[], &[]),
        ];
        disambiguator().disambiguate(&mut clusters);

        assert_eq!(clusters[0].label, "Careers");
        assert_eq!(clusters[1].label, "Careers #3");
        assert_eq!(clusters[2].label, "Careers #2");
    }

    #[test]
    fn labels_are_unique_after_heavy_collision() {
        let mut clusters: Vec<Cluster> = (0..8)
            .map(|id| cluster(id, "Data", &["data", "panel", "surveys"], &["Data"]))
            .collect();
        disambiguator().disambiguate(&mut clusters);

        let labels: HashSet<&str> = clusters.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels.len(), clusters.len());
        assert_eq!(clusters[0].label, "Data: Surveys");
        assert_eq!(clusters[1].label, "Data #2");
    }
}
