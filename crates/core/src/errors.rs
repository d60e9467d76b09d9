use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ConfigError;

/// Violated preconditions. Any of these aborts the whole run.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("metadata lists {metadata_rows} items but the vector file holds {vector_rows} rows")]
    RowCountMismatch { metadata_rows: usize, vector_rows: usize },
    #[error("vector file is {bytes} bytes, expected {expected} ({rows} rows x {dimensions} dims)")]
    VectorByteLength { bytes: usize, expected: usize, rows: usize, dimensions: usize },
    #[error("item id `{id}` appears more than once in the catalog")]
    DuplicateItemId { id: String },
    #[error("catalog has no items to cluster")]
    EmptyCatalog,
    #[error("cluster count {clusters} exceeds item count {items}")]
    ClusterCountExceedsItems { clusters: usize, items: usize },
    #[error("insufficient interaction data: {found} dwell records, need at least {required}")]
    InsufficientInteractions { found: usize, required: usize },
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// A source file that is absent or unusable. Fatal only for the file it names.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExternalDependencyError {
    #[error("required source file not found: `{path}`")]
    Missing { path: PathBuf },
    #[error("could not read `{path}`: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("`{path}` is not a well-formed collection: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

impl ExternalDependencyError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Missing { path } | Self::Read { path, .. } | Self::Malformed { path, .. } => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Input(#[from] ExternalDependencyError),
    #[error("could not write artifact `{path}`: {reason}")]
    Persistence { path: PathBuf, reason: String },
}

impl PipelineError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_validation",
            Self::Configuration(ConfigurationError::InsufficientInteractions { .. }) => {
                "insufficient_data"
            }
            Self::Configuration(_) => "precondition",
            Self::Input(_) => "input",
            Self::Persistence { .. } => "persistence",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Configuration(_) => 3,
            Self::Input(_) => 4,
            Self::Persistence { .. } => 5,
        }
    }
}
