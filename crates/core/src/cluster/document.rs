use std::collections::BTreeMap;

use crate::domain::cluster::{Cluster, ClusterDocument};
use crate::domain::embedding::{ItemId, ItemMetadata};
use crate::labels::{LabelDisambiguator, LabelSynthesizer};
use crate::quality::{DataQualityWarning, QualityReport};

const SAMPLE_ITEMS: usize = 10;

/// Turns raw cluster memberships into the persisted document: profile each
/// cluster, rank by size, reassign ids by rank, then make labels unique.
pub struct DocumentAssembler<'a> {
    synthesizer: &'a LabelSynthesizer,
    disambiguator: &'a LabelDisambiguator,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(synthesizer: &'a LabelSynthesizer, disambiguator: &'a LabelDisambiguator) -> Self {
        Self { synthesizer, disambiguator }
    }

    /// `members[c]` lists the row indices into `items` assigned to cluster `c`.
    /// Clusters without members are not emitted.
    pub fn assemble(
        &self,
        items: &[ItemMetadata],
        members: &[Vec<usize>],
        generated_at: String,
        report: &mut QualityReport,
    ) -> ClusterDocument {
        let mut clusters: Vec<Cluster> = members
            .iter()
            .filter(|rows| !rows.is_empty())
            .map(|rows| {
                let profile = self.synthesizer.synthesize(rows.iter().map(|&row| &items[row]));
                let member_items: Vec<ItemId> =
                    rows.iter().map(|&row| items[row].id.clone()).collect();
                Cluster {
                    id: 0,
                    label: profile.label,
                    top_tags: profile.top_tags,
                    top_categories: profile.top_categories,
                    item_count: member_items.len(),
                    sample_items: member_items.iter().take(SAMPLE_ITEMS).cloned().collect(),
                    member_items,
                }
            })
            .collect();

        clusters.sort_by(|left, right| right.item_count.cmp(&left.item_count));

        let mut item_to_cluster = BTreeMap::new();
        for (rank, cluster) in clusters.iter_mut().enumerate() {
            cluster.id = rank;
            for item in &cluster.member_items {
                item_to_cluster.insert(item.clone(), rank);
            }
        }

        for cluster in &clusters {
            if cluster.top_tags.is_empty() && cluster.top_categories.is_empty() {
                report.record(DataQualityWarning::UnlabeledCluster { cluster: cluster.id });
            }
        }

        self.disambiguator.disambiguate(&mut clusters);

        ClusterDocument {
            generated_at,
            num_clusters: clusters.len(),
            num_items: items.len(),
            clusters,
            item_to_cluster,
        }
    }
}
