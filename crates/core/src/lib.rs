pub mod artifacts;
pub mod cluster;
pub mod config;
pub mod domain;
pub mod engagement;
pub mod errors;
pub mod labels;
pub mod pipeline;
pub mod quality;
pub mod scoring;
pub mod vectors;

pub use cluster::{ClusterEngine, DocumentAssembler, KMeansFit};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use domain::cluster::{Cluster, ClusterDocument};
pub use domain::embedding::{EmbeddingMetadata, EmbeddingRecord, ItemId, ItemMetadata};
pub use domain::interaction::{ClickEvent, DwellEvent};
pub use domain::ranking::{CategoryRanking, CategoryRankingDocument, GlobalRankings, ScoreEntry};
pub use domain::recommendation::{RecommendationDocument, SimilarItem};
pub use engagement::{InteractionMatrix, MatrixBuilder, Recommender};
pub use errors::{ConfigurationError, ExternalDependencyError, PipelineError};
pub use labels::{LabelDisambiguator, LabelSynthesizer};
pub use pipeline::{build_recommendations, cluster_topics, inject_scores, JobSummary};
pub use quality::{DataQualityWarning, QualityReport};
pub use scoring::{CatalogFile, ScoreAggregator, ScoreTable};
pub use vectors::VectorStore;
