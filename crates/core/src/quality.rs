use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Recoverable conditions. Recorded and summarized, never fatal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    UnlabeledCluster { cluster: usize },
    ZeroNormVector { item: String },
    UnscoredItem { file: String, item: String },
    NegativeScoreClamped { name: String, score: f64 },
    DroppedRecommendation { item: String, reason: String },
    MalformedEvent { source: String, reason: String },
    SkippedCatalogFile { file: PathBuf, reason: String },
}

impl DataQualityWarning {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnlabeledCluster { .. } => "unlabeled_cluster",
            Self::ZeroNormVector { .. } => "zero_norm_vector",
            Self::UnscoredItem { .. } => "unscored_item",
            Self::NegativeScoreClamped { .. } => "negative_score_clamped",
            Self::DroppedRecommendation { .. } => "dropped_recommendation",
            Self::MalformedEvent { .. } => "malformed_event",
            Self::SkippedCatalogFile { .. } => "skipped_catalog_file",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedItem {
    pub item: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub file: PathBuf,
    pub reason: String,
}

/// Per-run aggregate of every [`DataQualityWarning`] raised.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    pub counts: BTreeMap<String, usize>,
    pub dropped_recommendations: Vec<DroppedItem>,
    pub skipped_files: Vec<SkippedFile>,
}

impl QualityReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, warning: DataQualityWarning) {
        tracing::debug!(event_name = "quality.warning", kind = warning.kind(), ?warning);
        *self.counts.entry(warning.kind().to_string()).or_insert(0) += 1;

        match warning {
            DataQualityWarning::DroppedRecommendation { item, reason } => {
                self.dropped_recommendations.push(DroppedItem { item, reason });
            }
            DataQualityWarning::SkippedCatalogFile { file, reason } => {
                self.skipped_files.push(SkippedFile { file, reason });
            }
            _ => {}
        }
    }

    pub fn count(&self, kind: &str) -> usize {
        self.counts.get(kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_clean(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn summary_line(&self) -> String {
        if self.is_clean() {
            return "no data quality warnings".to_string();
        }
        let parts: Vec<String> =
            self.counts.iter().map(|(kind, count)| format!("{kind}={count}")).collect();
        format!("{} data quality warnings ({})", self.total(), parts.join(", "))
    }
}
