use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "curator.toml";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub clustering: ClusteringConfig,
    pub labels: LabelConfig,
    pub factorization: FactorizationConfig,
    pub scoring: ScoringConfig,
    pub logging: LoggingConfig,
}

/// Relative entries are resolved against `data_dir` (or `embeddings_dir`) by the accessors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub embeddings_dir: PathBuf,
    pub embeddings_file: PathBuf,
    pub metadata_file: PathBuf,
    pub dwell_file: PathBuf,
    pub clicks_file: PathBuf,
    pub rankings_file: PathBuf,
    pub clusters_output: PathBuf,
    pub recommendations_output: PathBuf,
    pub category_rankings_output: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusteringConfig {
    pub target_cluster_size: usize,
    pub min_clusters: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub seed: u64,
    pub silhouette_sample: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelConfig {
    pub stop_tags: BTreeSet<String>,
    pub max_label_tags: usize,
    pub overlap_threshold: f64,
    pub max_suffix_len: usize,
    pub fallback_label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FactorizationConfig {
    pub max_factors: usize,
    pub min_factors: usize,
    pub regularization: f64,
    pub iterations: usize,
    pub alpha: f64,
    pub neighbors: usize,
    pub click_weight: f64,
    pub min_dwell_records: usize,
    pub seed: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoringConfig {
    pub catalog_files: Vec<String>,
    pub default_category: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

const DEFAULT_STOP_TAGS: [&str; 8] = [
    "career-portal",
    "job-search",
    "career-opportunities",
    "job-board",
    "economist-roles",
    "economist-jobs",
    "careers",
    "hiring",
];

const DEFAULT_CATALOG_FILES: [&str; 8] = [
    "packages.json",
    "datasets.json",
    "resources.json",
    "papers_flat.json",
    "career.json",
    "community.json",
    "talks.json",
    "books.json",
];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            clustering: ClusteringConfig::default(),
            labels: LabelConfig::default(),
            factorization: FactorizationConfig::default(),
            scoring: ScoringConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            embeddings_dir: PathBuf::from("static/embeddings"),
            embeddings_file: PathBuf::from("search-embeddings.bin"),
            metadata_file: PathBuf::from("search-metadata.json"),
            dwell_file: PathBuf::from("content_dwell.json"),
            clicks_file: PathBuf::from("content_clicks.json"),
            rankings_file: PathBuf::from("global_rankings.json"),
            clusters_output: PathBuf::from("topic_clusters_all.json"),
            recommendations_output: PathBuf::from("als-recommendations.json"),
            category_rankings_output: PathBuf::from("category_rankings.json"),
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            target_cluster_size: 15,
            min_clusters: 50,
            n_init: 10,
            max_iter: 300,
            seed: 42,
            silhouette_sample: 5000,
        }
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            stop_tags: DEFAULT_STOP_TAGS.iter().map(|tag| tag.to_string()).collect(),
            max_label_tags: 2,
            overlap_threshold: 0.7,
            max_suffix_len: 30,
            fallback_label: "Miscellaneous".to_string(),
        }
    }
}

impl Default for FactorizationConfig {
    fn default() -> Self {
        Self {
            max_factors: 32,
            min_factors: 5,
            regularization: 0.1,
            iterations: 15,
            alpha: 1.0,
            neighbors: 5,
            click_weight: 5.0,
            min_dwell_records: 5,
            seed: 42,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            catalog_files: DEFAULT_CATALOG_FILES.iter().map(|file| file.to_string()).collect(),
            default_category: "Uncategorized".to_string(),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl PathsConfig {
    fn in_data_dir(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    fn in_embeddings_dir(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.embeddings_dir.join(path)
        }
    }

    pub fn embeddings_path(&self) -> PathBuf {
        self.in_embeddings_dir(&self.embeddings_file)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.in_embeddings_dir(&self.metadata_file)
    }

    pub fn dwell_path(&self) -> PathBuf {
        self.in_data_dir(&self.dwell_file)
    }

    pub fn clicks_path(&self) -> PathBuf {
        self.in_data_dir(&self.clicks_file)
    }

    pub fn rankings_path(&self) -> PathBuf {
        self.in_data_dir(&self.rankings_file)
    }

    pub fn clusters_output_path(&self) -> PathBuf {
        self.in_data_dir(&self.clusters_output)
    }

    pub fn recommendations_output_path(&self) -> PathBuf {
        self.in_data_dir(&self.recommendations_output)
    }

    pub fn category_rankings_output_path(&self) -> PathBuf {
        self.in_data_dir(&self.category_rankings_output)
    }

    pub fn catalog_path(&self, file_name: &str) -> PathBuf {
        self.in_data_dir(Path::new(file_name))
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(paths) = patch.paths {
            let fields = [
                (paths.data_dir, &mut self.paths.data_dir),
                (paths.embeddings_dir, &mut self.paths.embeddings_dir),
                (paths.embeddings_file, &mut self.paths.embeddings_file),
                (paths.metadata_file, &mut self.paths.metadata_file),
                (paths.dwell_file, &mut self.paths.dwell_file),
                (paths.clicks_file, &mut self.paths.clicks_file),
                (paths.rankings_file, &mut self.paths.rankings_file),
                (paths.clusters_output, &mut self.paths.clusters_output),
                (paths.recommendations_output, &mut self.paths.recommendations_output),
                (paths.category_rankings_output, &mut self.paths.category_rankings_output),
            ];
            for (value, slot) in fields {
                if let Some(value) = value {
                    *slot = value;
                }
            }
        }

        if let Some(clustering) = patch.clustering {
            if let Some(target_cluster_size) = clustering.target_cluster_size {
                self.clustering.target_cluster_size = target_cluster_size;
            }
            if let Some(min_clusters) = clustering.min_clusters {
                self.clustering.min_clusters = min_clusters;
            }
            if let Some(n_init) = clustering.n_init {
                self.clustering.n_init = n_init;
            }
            if let Some(max_iter) = clustering.max_iter {
                self.clustering.max_iter = max_iter;
            }
            if let Some(seed) = clustering.seed {
                self.clustering.seed = seed;
            }
            if let Some(silhouette_sample) = clustering.silhouette_sample {
                self.clustering.silhouette_sample = silhouette_sample;
            }
        }

        if let Some(labels) = patch.labels {
            if let Some(stop_tags) = labels.stop_tags {
                self.labels.stop_tags =
                    stop_tags.into_iter().map(|tag| tag.trim().to_lowercase()).collect();
            }
            if let Some(max_label_tags) = labels.max_label_tags {
                self.labels.max_label_tags = max_label_tags;
            }
            if let Some(overlap_threshold) = labels.overlap_threshold {
                self.labels.overlap_threshold = overlap_threshold;
            }
            if let Some(max_suffix_len) = labels.max_suffix_len {
                self.labels.max_suffix_len = max_suffix_len;
            }
            if let Some(fallback_label) = labels.fallback_label {
                self.labels.fallback_label = fallback_label;
            }
        }

        if let Some(factorization) = patch.factorization {
            if let Some(max_factors) = factorization.max_factors {
                self.factorization.max_factors = max_factors;
            }
            if let Some(min_factors) = factorization.min_factors {
                self.factorization.min_factors = min_factors;
            }
            if let Some(regularization) = factorization.regularization {
                self.factorization.regularization = regularization;
            }
            if let Some(iterations) = factorization.iterations {
                self.factorization.iterations = iterations;
            }
            if let Some(alpha) = factorization.alpha {
                self.factorization.alpha = alpha;
            }
            if let Some(neighbors) = factorization.neighbors {
                self.factorization.neighbors = neighbors;
            }
            if let Some(click_weight) = factorization.click_weight {
                self.factorization.click_weight = click_weight;
            }
            if let Some(min_dwell_records) = factorization.min_dwell_records {
                self.factorization.min_dwell_records = min_dwell_records;
            }
            if let Some(seed) = factorization.seed {
                self.factorization.seed = seed;
            }
        }

        if let Some(scoring) = patch.scoring {
            if let Some(catalog_files) = scoring.catalog_files {
                self.scoring.catalog_files = catalog_files;
            }
            if let Some(default_category) = scoring.default_category {
                self.scoring.default_category = default_category;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CURATOR_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("CURATOR_EMBEDDINGS_DIR") {
            self.paths.embeddings_dir = PathBuf::from(value);
        }

        if let Some(value) = read_env("CURATOR_CLUSTERING_TARGET_SIZE") {
            self.clustering.target_cluster_size =
                parse_usize("CURATOR_CLUSTERING_TARGET_SIZE", &value)?;
        }
        if let Some(value) = read_env("CURATOR_CLUSTERING_MIN_CLUSTERS") {
            self.clustering.min_clusters = parse_usize("CURATOR_CLUSTERING_MIN_CLUSTERS", &value)?;
        }
        if let Some(value) = read_env("CURATOR_CLUSTERING_N_INIT") {
            self.clustering.n_init = parse_usize("CURATOR_CLUSTERING_N_INIT", &value)?;
        }
        if let Some(value) = read_env("CURATOR_CLUSTERING_SEED") {
            self.clustering.seed = parse_u64("CURATOR_CLUSTERING_SEED", &value)?;
        }

        if let Some(value) = read_env("CURATOR_FACTORIZATION_ITERATIONS") {
            self.factorization.iterations =
                parse_usize("CURATOR_FACTORIZATION_ITERATIONS", &value)?;
        }
        if let Some(value) = read_env("CURATOR_FACTORIZATION_REGULARIZATION") {
            self.factorization.regularization =
                parse_f64("CURATOR_FACTORIZATION_REGULARIZATION", &value)?;
        }
        if let Some(value) = read_env("CURATOR_FACTORIZATION_MIN_DWELL_RECORDS") {
            self.factorization.min_dwell_records =
                parse_usize("CURATOR_FACTORIZATION_MIN_DWELL_RECORDS", &value)?;
        }
        if let Some(value) = read_env("CURATOR_FACTORIZATION_SEED") {
            self.factorization.seed = parse_u64("CURATOR_FACTORIZATION_SEED", &value)?;
        }

        let log_level =
            read_env("CURATOR_LOGGING_LEVEL").or_else(|| read_env("CURATOR_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CURATOR_LOGGING_FORMAT").or_else(|| read_env("CURATOR_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(data_dir) = overrides.data_dir {
            self.paths.data_dir = data_dir;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_clustering(&self.clustering)?;
        validate_labels(&self.labels)?;
        validate_factorization(&self.factorization)?;
        validate_scoring(&self.scoring)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_clustering(clustering: &ClusteringConfig) -> Result<(), ConfigError> {
    if clustering.target_cluster_size == 0 {
        return Err(ConfigError::Validation(
            "clustering.target_cluster_size must be greater than zero".to_string(),
        ));
    }
    if clustering.min_clusters == 0 {
        return Err(ConfigError::Validation(
            "clustering.min_clusters must be greater than zero".to_string(),
        ));
    }
    if clustering.n_init < 10 {
        return Err(ConfigError::Validation(
            "clustering.n_init must be at least 10 initializations".to_string(),
        ));
    }
    if clustering.max_iter == 0 {
        return Err(ConfigError::Validation(
            "clustering.max_iter must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_labels(labels: &LabelConfig) -> Result<(), ConfigError> {
    if labels.max_label_tags == 0 {
        return Err(ConfigError::Validation(
            "labels.max_label_tags must be greater than zero".to_string(),
        ));
    }
    if !(labels.overlap_threshold > 0.0 && labels.overlap_threshold <= 1.0) {
        return Err(ConfigError::Validation(
            "labels.overlap_threshold must be in range (0, 1]".to_string(),
        ));
    }
    if labels.fallback_label.trim().is_empty() {
        return Err(ConfigError::Validation("labels.fallback_label must not be empty".to_string()));
    }
    Ok(())
}

fn validate_factorization(factorization: &FactorizationConfig) -> Result<(), ConfigError> {
    if factorization.min_factors == 0 || factorization.max_factors < factorization.min_factors {
        return Err(ConfigError::Validation(
            "factorization.max_factors must be >= factorization.min_factors > 0".to_string(),
        ));
    }
    if factorization.iterations == 0 {
        return Err(ConfigError::Validation(
            "factorization.iterations must be greater than zero".to_string(),
        ));
    }
    if !(factorization.regularization > 0.0) {
        return Err(ConfigError::Validation(
            "factorization.regularization must be positive".to_string(),
        ));
    }
    if !(factorization.alpha > 0.0) {
        return Err(ConfigError::Validation("factorization.alpha must be positive".to_string()));
    }
    if factorization.neighbors == 0 {
        return Err(ConfigError::Validation(
            "factorization.neighbors must be greater than zero".to_string(),
        ));
    }
    if !(factorization.click_weight >= 0.0) {
        return Err(ConfigError::Validation(
            "factorization.click_weight must not be negative".to_string(),
        ));
    }
    if factorization.min_dwell_records == 0 {
        return Err(ConfigError::Validation(
            "factorization.min_dwell_records must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_scoring(scoring: &ScoringConfig) -> Result<(), ConfigError> {
    if scoring.catalog_files.is_empty() {
        return Err(ConfigError::Validation(
            "scoring.catalog_files must list at least one file".to_string(),
        ));
    }
    if scoring.default_category.trim().is_empty() {
        return Err(ConfigError::Validation(
            "scoring.default_category must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    paths: Option<PathsPatch>,
    clustering: Option<ClusteringPatch>,
    labels: Option<LabelsPatch>,
    factorization: Option<FactorizationPatch>,
    scoring: Option<ScoringPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct PathsPatch {
    data_dir: Option<PathBuf>,
    embeddings_dir: Option<PathBuf>,
    embeddings_file: Option<PathBuf>,
    metadata_file: Option<PathBuf>,
    dwell_file: Option<PathBuf>,
    clicks_file: Option<PathBuf>,
    rankings_file: Option<PathBuf>,
    clusters_output: Option<PathBuf>,
    recommendations_output: Option<PathBuf>,
    category_rankings_output: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ClusteringPatch {
    target_cluster_size: Option<usize>,
    min_clusters: Option<usize>,
    n_init: Option<usize>,
    max_iter: Option<usize>,
    seed: Option<u64>,
    silhouette_sample: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LabelsPatch {
    stop_tags: Option<Vec<String>>,
    max_label_tags: Option<usize>,
    overlap_threshold: Option<f64>,
    max_suffix_len: Option<usize>,
    fallback_label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FactorizationPatch {
    max_factors: Option<usize>,
    min_factors: Option<usize>,
    regularization: Option<f64>,
    iterations: Option<usize>,
    alpha: Option<f64>,
    neighbors: Option<usize>,
    click_weight: Option<f64>,
    min_dwell_records: Option<usize>,
    seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ScoringPatch {
    catalog_files: Option<Vec<String>>,
    default_category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_batch_constants() -> Result<(), String> {
        let config = AppConfig::default();
        config.validate().map_err(|err| err.to_string())?;

        ensure(config.clustering.target_cluster_size == 15, "target size defaults to 15")?;
        ensure(config.clustering.min_clusters == 50, "K_min defaults to 50")?;
        ensure(config.clustering.n_init == 10, "ten initializations by default")?;
        ensure(config.factorization.iterations == 15, "fifteen ALS iterations by default")?;
        ensure(config.factorization.min_dwell_records == 5, "five dwell records minimum")?;
        ensure(config.labels.stop_tags.contains("job-board"), "stop tags are seeded")?;
        ensure(config.scoring.catalog_files.len() == 8, "eight catalog files by default")?;
        Ok(())
    }

    #[test]
    fn relative_paths_resolve_under_data_dir() {
        let config = AppConfig::default();
        assert_eq!(
            config.paths.clusters_output_path(),
            PathBuf::from("data").join("topic_clusters_all.json")
        );
        assert_eq!(
            config.paths.metadata_path(),
            PathBuf::from("static/embeddings").join("search-metadata.json")
        );
        assert_eq!(config.paths.catalog_path("books.json"), PathBuf::from("data/books.json"));
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_CURATOR_DATA_ROOT", "/srv/catalog");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("curator.toml");
            fs::write(
                &path,
                r#"
[paths]
data_dir = "${TEST_CURATOR_DATA_ROOT}/data"

[labels]
stop_tags = ["Hiring", "internships"]
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.paths.data_dir == PathBuf::from("/srv/catalog/data"),
                "data dir should be interpolated from environment",
            )?;
            ensure(config.labels.stop_tags.contains("hiring"), "stop tags are case-folded")?;
            ensure(
                !config.labels.stop_tags.contains("job-board"),
                "file stop tags replace the defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_CURATOR_DATA_ROOT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CURATOR_DATA_DIR", "from-env");
        env::set_var("CURATOR_CLUSTERING_TARGET_SIZE", "20");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("curator.toml");
            fs::write(
                &path,
                r#"
[paths]
data_dir = "from-file"

[clustering]
target_cluster_size = 12
min_clusters = 8

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    data_dir: Some(PathBuf::from("from-override")),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.paths.data_dir == PathBuf::from("from-override"),
                "override data dir should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.clustering.target_cluster_size == 20, "env should win over file")?;
            ensure(config.clustering.min_clusters == 8, "file should win over defaults")?;
            Ok(())
        })();

        clear_vars(&["CURATOR_DATA_DIR", "CURATOR_CLUSTERING_TARGET_SIZE"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CURATOR_LOG_LEVEL", "warn");
        env::set_var("CURATOR_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["CURATOR_LOG_LEVEL", "CURATOR_LOG_FORMAT"]);
        result
    }

    #[test]
    fn invalid_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CURATOR_CLUSTERING_N_INIT", "many");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected override parse failure".to_string()),
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "CURATOR_CLUSTERING_N_INIT", "error should name the variable")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(&["CURATOR_CLUSTERING_N_INIT"]);
        result
    }

    #[test]
    fn validation_rejects_too_few_initializations() -> Result<(), String> {
        let mut config = AppConfig::default();
        config.clustering.n_init = 3;

        let error = match config.validate() {
            Ok(()) => return Err("expected validation failure".to_string()),
            Err(error) => error,
        };
        ensure(
            matches!(error, ConfigError::Validation(ref message) if message.contains("n_init")),
            "validation failure should mention clustering.n_init",
        )
    }

    #[test]
    fn missing_required_file_fails_fast() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/curator.toml")),
            require_file: true,
            ..LoadOptions::default()
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }
}
