use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::embedding::ItemId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Rank by descending `item_count`; not stable across runs.
    pub id: usize,
    pub label: String,
    pub top_tags: Vec<String>,
    pub top_categories: Vec<String>,
    pub item_count: usize,
    pub sample_items: Vec<ItemId>,
    pub member_items: Vec<ItemId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterDocument {
    pub generated_at: String,
    pub num_clusters: usize,
    pub num_items: usize,
    pub clusters: Vec<Cluster>,
    pub item_to_cluster: BTreeMap<ItemId, usize>,
}
