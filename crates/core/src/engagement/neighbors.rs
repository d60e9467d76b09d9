use std::cmp::Ordering;

use ndarray::Array2;

use crate::artifacts::round_to;
use crate::domain::recommendation::{RecommendationDocument, SimilarItem};
use crate::engagement::als::FactorModel;
use crate::quality::{DataQualityWarning, QualityReport};

/// Cosine nearest neighbors over item factors. `names[i]` labels factor row `i`.
///
/// For every item the `neighbors + 1` most similar rows are taken, the query is
/// removed, and the rest is truncated to `neighbors`. Items whose factor vector
/// has no direction are skipped and reported.
pub fn similar_items(
    model: &FactorModel,
    names: &[String],
    neighbors: usize,
    report: &mut QualityReport,
) -> RecommendationDocument {
    let normalized = unit_rows(&model.item_factors);
    let mut document = RecommendationDocument::new();

    for (query, name) in names.iter().enumerate().take(normalized.rows.nrows()) {
        if !normalized.usable[query] {
            report.record(DataQualityWarning::DroppedRecommendation {
                item: name.clone(),
                reason: "zero-norm factor vector".to_string(),
            });
            continue;
        }

        let query_row = normalized.rows.row(query);
        let mut scored: Vec<(usize, f64)> = (0..normalized.rows.nrows())
            .filter(|&candidate| normalized.usable[candidate])
            .map(|candidate| (candidate, query_row.dot(&normalized.rows.row(candidate))))
            .collect();
        scored.sort_by(|left, right| {
            right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal).then(left.0.cmp(&right.0))
        });

        let similar: Vec<SimilarItem> = scored
            .into_iter()
            .take(neighbors + 1)
            .filter(|&(candidate, _)| candidate != query)
            .take(neighbors)
            .filter_map(|(candidate, score)| {
                names.get(candidate).map(|neighbor| SimilarItem {
                    name: neighbor.clone(),
                    score: round_to(score, 4),
                })
            })
            .collect();

        if !similar.is_empty() {
            document.insert(name.clone(), similar);
        }
    }

    document
}

struct UnitRows {
    rows: Array2<f64>,
    usable: Vec<bool>,
}

fn unit_rows(factors: &Array2<f64>) -> UnitRows {
    let mut rows = factors.clone();
    let mut usable = Vec::with_capacity(rows.nrows());
    for mut row in rows.rows_mut() {
        let norm = row.dot(&row).sqrt();
        if norm > f64::EPSILON && norm.is_finite() {
            row.mapv_inplace(|value| value / norm);
            usable.push(true);
        } else {
            usable.push(false);
        }
    }
    UnitRows { rows, usable }
}
