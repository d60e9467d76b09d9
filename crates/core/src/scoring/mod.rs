//! Model score injection and per-category roll-ups.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;

use crate::artifacts::round_to;
use crate::config::ScoringConfig;
use crate::domain::ranking::{CategoryRanking, GlobalRankings};
use crate::quality::{DataQualityWarning, QualityReport};

pub const SCORE_FIELD: &str = "model_score";

/// Case-insensitive name to score lookup. Later entries win on duplicate names.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreTable {
    scores: HashMap<String, f64>,
}

impl ScoreTable {
    pub fn from_rankings(rankings: &GlobalRankings, report: &mut QualityReport) -> Self {
        let mut scores = HashMap::with_capacity(rankings.rankings.len());
        for entry in &rankings.rankings {
            let score = if entry.score.is_finite() && entry.score >= 0.0 {
                entry.score
            } else {
                report.record(DataQualityWarning::NegativeScoreClamped {
                    name: entry.name.clone(),
                    score: entry.score,
                });
                0.0
            };
            scores.insert(entry.name.to_lowercase(), score);
        }
        Self { scores }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn lookup(&self, name: &str) -> Option<f64> {
        self.scores.get(&name.to_lowercase()).copied()
    }
}

/// One catalog file's items as loaded; every item is a JSON object.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogFile {
    pub file_name: String,
    pub items: Vec<Value>,
}

impl CatalogFile {
    /// `papers_flat.json` becomes `papers`.
    pub fn content_type(&self) -> String {
        content_type(&self.file_name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoredCatalog {
    pub content_type: String,
    pub items: Vec<Value>,
    pub matched: usize,
    pub categories: Vec<CategoryRanking>,
}

#[derive(Clone, Debug)]
pub struct ScoreAggregator {
    default_category: String,
}

impl ScoreAggregator {
    pub fn new(config: &ScoringConfig) -> Self {
        Self { default_category: config.default_category.clone() }
    }

    pub fn score(
        &self,
        table: &ScoreTable,
        catalog: CatalogFile,
        report: &mut QualityReport,
    ) -> ScoredCatalog {
        let content_type = catalog.content_type();
        let mut items = catalog.items;
        let mut totals = CategoryTotals::default();
        let mut matched = 0;

        for item in &mut items {
            let name = item.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
            let score = match table.lookup(&name) {
                Some(score) => score,
                None => {
                    report.record(DataQualityWarning::UnscoredItem {
                        file: catalog.file_name.clone(),
                        item: name.clone(),
                    });
                    0.0
                }
            };
            if score > 0.0 {
                matched += 1;
            }

            totals.add(self.category_of(item), score);
            if let Value::Object(fields) = item {
                fields.insert(SCORE_FIELD.to_string(), Value::from(round_to(score, 4)));
            }
        }

        items.sort_by(|left, right| descending(score_of(left), score_of(right)));
        let mut categories = totals.into_rankings();
        categories.sort_by(|left, right| {
            descending(left.total_score, right.total_score)
                .then_with(|| left.category.cmp(&right.category))
        });

        tracing::info!(
            event_name = "scoring.file.scored",
            content_type = %content_type,
            matched,
            items = items.len(),
            "catalog items scored and sorted"
        );
        ScoredCatalog { content_type, items, matched, categories }
    }

    fn category_of(&self, item: &Value) -> String {
        match item.get("category") {
            None | Some(Value::Null) => self.default_category.clone(),
            Some(Value::String(category)) if category.trim().is_empty() => {
                self.default_category.clone()
            }
            Some(Value::String(category)) => category.clone(),
            Some(other) => other.to_string(),
        }
    }
}

pub fn content_type(file_name: &str) -> String {
    file_name.replace(".json", "").replace("_flat", "")
}

fn score_of(item: &Value) -> f64 {
    item.get(SCORE_FIELD).and_then(Value::as_f64).unwrap_or(0.0)
}

fn descending(left: f64, right: f64) -> Ordering {
    right.partial_cmp(&left).unwrap_or(Ordering::Equal)
}

#[derive(Default)]
struct CategoryTotals {
    order: Vec<String>,
    stats: HashMap<String, CategoryStats>,
}

#[derive(Default)]
struct CategoryStats {
    total: f64,
    count: usize,
    max: f64,
    engaged: usize,
}

impl CategoryTotals {
    fn add(&mut self, category: String, score: f64) {
        if !self.stats.contains_key(&category) {
            self.order.push(category.clone());
        }
        let stats = self.stats.entry(category).or_default();
        stats.total += score;
        stats.count += 1;
        stats.max = stats.max.max(score);
        if score > 0.0 {
            stats.engaged += 1;
        }
    }

    fn into_rankings(mut self) -> Vec<CategoryRanking> {
        self.order
            .into_iter()
            .filter_map(|category| {
                let stats = self.stats.remove(&category)?;
                let average = if stats.count > 0 { stats.total / stats.count as f64 } else { 0.0 };
                Some(CategoryRanking {
                    category,
                    total_score: round_to(stats.total, 3),
                    avg_score: round_to(average, 4),
                    max_score: round_to(stats.max, 4),
                    count: stats.count,
                    engaged_count: stats.engaged,
                })
            })
            .collect()
    }
}
