use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use curator_core::config::DEFAULT_CONFIG_FILE;
use toml::Value;

use super::{CommandResult, GlobalOptions};

pub const CONFIG_COMMAND: &str = "config";

pub fn run(options: &GlobalOptions) -> CommandResult {
    let config = match options.load_config(CONFIG_COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let config_file_path = detect_config_path(options.config.as_deref());
    let config_file_doc = match config_file_path.as_deref().map(load_config_file_doc) {
        Some(Ok(doc)) => Some(doc),
        Some(Err(error)) => {
            tracing::warn!(
                event_name = "cli.config.unreadable",
                error = %format!("{error:#}"),
                "config file could not be re-read for source attribution"
            );
            None
        }
        None => None,
    };
    let sources = Sources {
        doc: config_file_doc.as_ref(),
        path: config_file_path.as_deref(),
    };

    let mut lines =
        vec!["effective config (source precedence: cli > env > file > default):".to_string()];

    let paths = &config.paths;
    lines.push(render_line(
        "paths.data_dir",
        &paths.data_dir.display().to_string(),
        sources.of(
            "paths.data_dir",
            &["CURATOR_DATA_DIR"],
            options.data_dir.as_ref().map(|_| "--data-dir"),
        ),
    ));
    lines.push(render_line(
        "paths.embeddings_dir",
        &paths.embeddings_dir.display().to_string(),
        sources.of("paths.embeddings_dir", &["CURATOR_EMBEDDINGS_DIR"], None),
    ));
    for (key, value) in [
        ("paths.embeddings_file", paths.embeddings_path()),
        ("paths.metadata_file", paths.metadata_path()),
        ("paths.dwell_file", paths.dwell_path()),
        ("paths.clicks_file", paths.clicks_path()),
        ("paths.rankings_file", paths.rankings_path()),
        ("paths.clusters_output", paths.clusters_output_path()),
        ("paths.recommendations_output", paths.recommendations_output_path()),
        ("paths.category_rankings_output", paths.category_rankings_output_path()),
    ] {
        lines.push(render_line(key, &value.display().to_string(), sources.of(key, &[], None)));
    }

    let clustering = &config.clustering;
    lines.push(render_line(
        "clustering.target_cluster_size",
        &clustering.target_cluster_size.to_string(),
        sources.of("clustering.target_cluster_size", &["CURATOR_CLUSTERING_TARGET_SIZE"], None),
    ));
    lines.push(render_line(
        "clustering.min_clusters",
        &clustering.min_clusters.to_string(),
        sources.of("clustering.min_clusters", &["CURATOR_CLUSTERING_MIN_CLUSTERS"], None),
    ));
    lines.push(render_line(
        "clustering.n_init",
        &clustering.n_init.to_string(),
        sources.of("clustering.n_init", &["CURATOR_CLUSTERING_N_INIT"], None),
    ));
    lines.push(render_line(
        "clustering.max_iter",
        &clustering.max_iter.to_string(),
        sources.of("clustering.max_iter", &[], None),
    ));
    lines.push(render_line(
        "clustering.seed",
        &clustering.seed.to_string(),
        sources.of("clustering.seed", &["CURATOR_CLUSTERING_SEED"], None),
    ));
    lines.push(render_line(
        "clustering.silhouette_sample",
        &clustering.silhouette_sample.to_string(),
        sources.of("clustering.silhouette_sample", &[], None),
    ));

    let labels = &config.labels;
    let stop_tags: Vec<&str> = labels.stop_tags.iter().map(String::as_str).collect();
    lines.push(render_line(
        "labels.stop_tags",
        &format!("[{}]", stop_tags.join(", ")),
        sources.of("labels.stop_tags", &[], None),
    ));
    lines.push(render_line(
        "labels.max_label_tags",
        &labels.max_label_tags.to_string(),
        sources.of("labels.max_label_tags", &[], None),
    ));
    lines.push(render_line(
        "labels.overlap_threshold",
        &labels.overlap_threshold.to_string(),
        sources.of("labels.overlap_threshold", &[], None),
    ));
    lines.push(render_line(
        "labels.max_suffix_len",
        &labels.max_suffix_len.to_string(),
        sources.of("labels.max_suffix_len", &[], None),
    ));
    lines.push(render_line(
        "labels.fallback_label",
        &labels.fallback_label,
        sources.of("labels.fallback_label", &[], None),
    ));

    let factorization = &config.factorization;
    lines.push(render_line(
        "factorization.max_factors",
        &factorization.max_factors.to_string(),
        sources.of("factorization.max_factors", &[], None),
    ));
    lines.push(render_line(
        "factorization.min_factors",
        &factorization.min_factors.to_string(),
        sources.of("factorization.min_factors", &[], None),
    ));
    lines.push(render_line(
        "factorization.regularization",
        &factorization.regularization.to_string(),
        sources.of(
            "factorization.regularization",
            &["CURATOR_FACTORIZATION_REGULARIZATION"],
            None,
        ),
    ));
    lines.push(render_line(
        "factorization.iterations",
        &factorization.iterations.to_string(),
        sources.of("factorization.iterations", &["CURATOR_FACTORIZATION_ITERATIONS"], None),
    ));
    lines.push(render_line(
        "factorization.alpha",
        &factorization.alpha.to_string(),
        sources.of("factorization.alpha", &[], None),
    ));
    lines.push(render_line(
        "factorization.neighbors",
        &factorization.neighbors.to_string(),
        sources.of("factorization.neighbors", &[], None),
    ));
    lines.push(render_line(
        "factorization.click_weight",
        &factorization.click_weight.to_string(),
        sources.of("factorization.click_weight", &[], None),
    ));
    lines.push(render_line(
        "factorization.min_dwell_records",
        &factorization.min_dwell_records.to_string(),
        sources.of(
            "factorization.min_dwell_records",
            &["CURATOR_FACTORIZATION_MIN_DWELL_RECORDS"],
            None,
        ),
    ));
    lines.push(render_line(
        "factorization.seed",
        &factorization.seed.to_string(),
        sources.of("factorization.seed", &["CURATOR_FACTORIZATION_SEED"], None),
    ));

    lines.push(render_line(
        "scoring.catalog_files",
        &format!("[{}]", config.scoring.catalog_files.join(", ")),
        sources.of("scoring.catalog_files", &[], None),
    ));
    lines.push(render_line(
        "scoring.default_category",
        &config.scoring.default_category,
        sources.of("scoring.default_category", &[], None),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        sources.of(
            "logging.level",
            &["CURATOR_LOGGING_LEVEL", "CURATOR_LOG_LEVEL"],
            options.log_level.as_ref().map(|_| "--log-level"),
        ),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        sources.of("logging.format", &["CURATOR_LOGGING_FORMAT", "CURATOR_LOG_FORMAT"], None),
    ));

    CommandResult::success(CONFIG_COMMAND, lines.join("\n"), Vec::new(), options.json)
}

struct Sources<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

impl Sources<'_> {
    fn of(&self, key_path: &str, env_keys: &[&str], cli_flag: Option<&str>) -> String {
        if let Some(flag) = cli_flag {
            return format!("cli ({flag})");
        }

        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from(DEFAULT_CONFIG_FILE);
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config").join(DEFAULT_CONFIG_FILE);
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: &Path) -> anyhow::Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config file `{}`", path.display()))?;
    raw.parse::<Value>().with_context(|| format!("parsing config file `{}`", path.display()))
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::{contains_path, render_line};

    #[test]
    fn nested_keys_are_found_in_the_file_document() {
        let doc: toml::Value = "[clustering]\nmin_clusters = 4\n".parse().expect("toml");
        assert!(contains_path(&doc, "clustering.min_clusters"));
        assert!(!contains_path(&doc, "clustering.seed"));
        assert!(!contains_path(&doc, "labels.fallback_label"));
    }

    #[test]
    fn lines_carry_their_source() {
        assert_eq!(
            render_line("clustering.seed", "42", "default".to_string()),
            "- clustering.seed = 42 (source: default)"
        );
    }
}
