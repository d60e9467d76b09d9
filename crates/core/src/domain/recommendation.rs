use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarItem {
    pub name: String,
    pub score: f64,
}

/// Item name to its ordered neighbor list. Self-similarity never appears.
pub type RecommendationDocument = BTreeMap<String, Vec<SimilarItem>>;
