//! Batch jobs. Each job loads fresh inputs, computes in memory, and only then
//! replaces its output artifacts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::artifacts;
use crate::cluster::{silhouette_score, ClusterEngine, DocumentAssembler};
use crate::config::AppConfig;
use crate::domain::cluster::ClusterDocument;
use crate::domain::interaction::{ClickEvent, DwellEvent};
use crate::domain::ranking::{CategoryRankingDocument, GlobalRankings};
use crate::engagement::Recommender;
use crate::errors::{ConfigurationError, ExternalDependencyError, PipelineError};
use crate::labels::{LabelDisambiguator, LabelSynthesizer};
use crate::quality::{DataQualityWarning, QualityReport};
use crate::scoring::{CatalogFile, ScoreAggregator, ScoreTable};
use crate::vectors::{normalize_rows, VectorStore};

pub const CLUSTER_JOB: &str = "cluster";
pub const RECOMMEND_JOB: &str = "recommend";
pub const SCORE_JOB: &str = "score";

const HIGHLIGHT_LIMIT: usize = 15;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobSummary {
    pub job: String,
    pub metrics: BTreeMap<String, f64>,
    pub quality: QualityReport,
    pub artifacts: Vec<PathBuf>,
    /// Human-readable digest lines for operator output.
    pub highlights: Vec<String>,
}

impl JobSummary {
    fn new(job: &str) -> Self {
        Self {
            job: job.to_string(),
            metrics: BTreeMap::new(),
            quality: QualityReport::new(),
            artifacts: Vec::new(),
            highlights: Vec::new(),
        }
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.insert(name.to_string(), value);
    }

    pub fn metric_value(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    fn finish(self) -> Self {
        if self.quality.is_clean() {
            tracing::info!(
                event_name = "pipeline.job.completed",
                correlation_id = %self.job,
                "{}",
                self.quality.summary_line()
            );
        } else {
            tracing::warn!(
                event_name = "pipeline.job.completed",
                correlation_id = %self.job,
                warnings = self.quality.total(),
                "{}",
                self.quality.summary_line()
            );
        }
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClusteringOutcome {
    pub document: ClusterDocument,
    pub silhouette: Option<f64>,
    pub inertia: f64,
}

/// Clusters an in-memory store. Nothing is persisted.
pub fn cluster_store(
    config: &AppConfig,
    store: &VectorStore,
    report: &mut QualityReport,
) -> Result<ClusteringOutcome, ConfigurationError> {
    if store.is_empty() {
        return Err(ConfigurationError::EmptyCatalog);
    }

    let normalized = normalize_rows(store.vectors());
    for row in &normalized.zero_norm_rows {
        report.record(DataQualityWarning::ZeroNormVector {
            item: store.items()[*row].id.to_string(),
        });
    }

    let engine = ClusterEngine::new(config.clustering.clone());
    let clusters = engine.cluster_count(store.len());
    let fit = engine.fit(&normalized.vectors, clusters)?;
    tracing::info!(
        event_name = "pipeline.cluster.fitted",
        clusters,
        inertia = fit.inertia,
        iterations = fit.iterations,
        best_run = fit.run,
        "k-means converged"
    );

    let silhouette = silhouette_score(
        &normalized.vectors,
        &fit.assignments,
        config.clustering.silhouette_sample,
        config.clustering.seed,
    );
    if let Some(score) = silhouette {
        tracing::info!(event_name = "pipeline.cluster.silhouette", silhouette = score);
    }

    let synthesizer = LabelSynthesizer::new(&config.labels);
    let disambiguator = LabelDisambiguator::new(&config.labels);
    let document = DocumentAssembler::new(&synthesizer, &disambiguator).assemble(
        store.items(),
        &fit.members(),
        generated_at(),
        report,
    );

    Ok(ClusteringOutcome { document, silhouette, inertia: fit.inertia })
}

pub fn cluster_topics(config: &AppConfig) -> Result<JobSummary, PipelineError> {
    let mut summary = JobSummary::new(CLUSTER_JOB);
    let metadata_path = config.paths.metadata_path();
    let embeddings_path = config.paths.embeddings_path();
    tracing::info!(
        event_name = "pipeline.cluster.start",
        correlation_id = CLUSTER_JOB,
        metadata = %metadata_path.display(),
        embeddings = %embeddings_path.display(),
        "clustering topics"
    );

    let store = VectorStore::load(&metadata_path, &embeddings_path)?;
    let outcome = cluster_store(config, &store, &mut summary.quality)?;

    let output = config.paths.clusters_output_path();
    artifacts::write_json_atomic(&output, &outcome.document)?;

    summary.metric("items", outcome.document.num_items as f64);
    summary.metric("clusters", outcome.document.num_clusters as f64);
    summary.metric("inertia", outcome.inertia);
    if let Some(score) = outcome.silhouette {
        summary.metric("silhouette", score);
    }
    summary.highlights = outcome
        .document
        .clusters
        .iter()
        .take(HIGHLIGHT_LIMIT)
        .map(|cluster| {
            let tags: Vec<&str> = cluster.top_tags.iter().take(3).map(String::as_str).collect();
            let samples: Vec<&str> =
                cluster.sample_items.iter().take(3).map(|item| item.0.as_str()).collect();
            format!(
                "[{}] {} ({} items) tags: {} | sample: {}",
                cluster.id,
                cluster.label,
                cluster.item_count,
                tags.join(", "),
                samples.join(", ")
            )
        })
        .collect();
    summary.artifacts.push(output);
    Ok(summary.finish())
}

pub fn build_recommendations(config: &AppConfig) -> Result<JobSummary, PipelineError> {
    let mut summary = JobSummary::new(RECOMMEND_JOB);
    tracing::info!(
        event_name = "pipeline.recommend.start",
        correlation_id = RECOMMEND_JOB,
        dwell = %config.paths.dwell_path().display(),
        clicks = %config.paths.clicks_path().display(),
        "building recommendations"
    );

    let dwell: Vec<DwellEvent> = artifacts::read_rows(&config.paths.dwell_path())?;
    let clicks: Vec<ClickEvent> = artifacts::read_rows(&config.paths.clicks_path())?;
    summary.metric("dwell_records", dwell.len() as f64);
    summary.metric("click_records", clicks.len() as f64);

    let outcome = Recommender::new(&config.factorization).recommend(
        &dwell,
        &clicks,
        &mut summary.quality,
    )?;

    let output = config.paths.recommendations_output_path();
    artifacts::write_json_atomic(&output, &outcome.document)?;

    summary.metric("sessions", outcome.sessions as f64);
    summary.metric("items", outcome.items as f64);
    summary.metric("nnz", outcome.nnz as f64);
    summary.metric("sparsity_pct", outcome.sparsity);
    summary.metric("factors", outcome.factors as f64);
    summary.metric("recommended_items", outcome.document.len() as f64);
    summary.highlights = outcome
        .document
        .iter()
        .take(3)
        .map(|(item, similar)| {
            let neighbors: Vec<String> = similar
                .iter()
                .take(3)
                .map(|neighbor| format!("{} ({:.3})", neighbor.name, neighbor.score))
                .collect();
            format!("{item}: {}", neighbors.join(", "))
        })
        .collect();
    summary.artifacts.push(output);
    Ok(summary.finish())
}

pub fn inject_scores(config: &AppConfig) -> Result<JobSummary, PipelineError> {
    let mut summary = JobSummary::new(SCORE_JOB);
    let rankings_path = config.paths.rankings_path();
    tracing::info!(
        event_name = "pipeline.score.start",
        correlation_id = SCORE_JOB,
        rankings = %rankings_path.display(),
        files = config.scoring.catalog_files.len(),
        "injecting model scores"
    );

    let rankings: GlobalRankings = artifacts::read_json(&rankings_path)?;
    let table = ScoreTable::from_rankings(&rankings, &mut summary.quality);
    summary.metric("scores", table.len() as f64);

    let aggregator = ScoreAggregator::new(&config.scoring);
    let mut document = CategoryRankingDocument::default();
    let mut scored_items = 0usize;
    let mut matched_items = 0usize;

    for file_name in &config.scoring.catalog_files {
        let path = config.paths.catalog_path(file_name);
        let catalog = match load_catalog(&path, file_name) {
            Ok(catalog) => catalog,
            Err(error) => {
                tracing::warn!(
                    event_name = "pipeline.score.file_skipped",
                    correlation_id = SCORE_JOB,
                    file = %path.display(),
                    error = %error,
                    "catalog file skipped"
                );
                summary.quality.record(DataQualityWarning::SkippedCatalogFile {
                    file: error.path().to_path_buf(),
                    reason: error.to_string(),
                });
                continue;
            }
        };

        let scored = aggregator.score(&table, catalog, &mut summary.quality);
        artifacts::write_json_atomic(&path, &scored.items)?;

        scored_items += scored.items.len();
        matched_items += scored.matched;
        summary.artifacts.push(path);
        document.entries.push((scored.content_type, scored.categories));
    }

    let output = config.paths.category_rankings_output_path();
    artifacts::write_json_atomic(&output, &document)?;

    summary.metric("files", document.entries.len() as f64);
    summary.metric("items", scored_items as f64);
    summary.metric("matched_items", matched_items as f64);
    for (content_type, categories) in &document.entries {
        summary.highlights.push(format!("{}:", content_type.to_uppercase()));
        for category in categories.iter().take(5) {
            summary.highlights.push(format!(
                "  {:>6.2}  {} ({}/{} engaged)",
                category.total_score, category.category, category.engaged_count, category.count
            ));
        }
    }
    summary.artifacts.push(output);
    Ok(summary.finish())
}

fn load_catalog(path: &Path, file_name: &str) -> Result<CatalogFile, ExternalDependencyError> {
    let value: Value = artifacts::read_json(path)?;
    let Value::Array(items) = value else {
        return Err(ExternalDependencyError::Malformed {
            path: path.to_path_buf(),
            reason: "expected a JSON array of items".to_string(),
        });
    };
    if let Some(position) = items.iter().position(|item| !item.is_object()) {
        return Err(ExternalDependencyError::Malformed {
            path: path.to_path_buf(),
            reason: format!("item {position} is not an object"),
        });
    }
    Ok(CatalogFile { file_name: file_name.to_string(), items })
}

fn generated_at() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}
