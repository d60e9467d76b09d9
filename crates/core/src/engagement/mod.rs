//! Collaborative filtering over session engagement: interaction matrix, ALS
//! factor model, item-item neighbors.

mod als;
mod matrix;
mod neighbors;

pub use als::{AlternatingLeastSquares, FactorModel};
pub use matrix::{InteractionMatrix, MatrixBuilder};
pub use neighbors::similar_items;

use crate::config::FactorizationConfig;
use crate::domain::interaction::{ClickEvent, DwellEvent};
use crate::domain::recommendation::RecommendationDocument;
use crate::errors::ConfigurationError;
use crate::quality::QualityReport;

#[derive(Clone, Debug, PartialEq)]
pub struct RecommendationOutcome {
    pub document: RecommendationDocument,
    pub sessions: usize,
    pub items: usize,
    pub nnz: usize,
    pub sparsity: f64,
    pub factors: usize,
}

#[derive(Clone, Debug)]
pub struct Recommender {
    builder: MatrixBuilder,
    als: AlternatingLeastSquares,
    neighbors: usize,
}

impl Recommender {
    pub fn new(config: &FactorizationConfig) -> Self {
        Self {
            builder: MatrixBuilder::new(config),
            als: AlternatingLeastSquares::new(config),
            neighbors: config.neighbors,
        }
    }

    pub fn recommend(
        &self,
        dwell: &[DwellEvent],
        clicks: &[ClickEvent],
        report: &mut QualityReport,
    ) -> Result<RecommendationOutcome, ConfigurationError> {
        let matrix = self.builder.build(dwell, clicks, report)?;
        let model = self.als.fit(&matrix)?;
        let document = similar_items(&model, matrix.items(), self.neighbors, report);
        let (sessions, items) = matrix.shape();

        Ok(RecommendationOutcome {
            document,
            sessions,
            items,
            nnz: matrix.nnz(),
            sparsity: matrix.sparsity(),
            factors: model.factors(),
        })
    }
}
