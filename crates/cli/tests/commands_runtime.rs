use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use curator_cli::commands::{all, cluster, config, recommend, score, GlobalOptions};
use serde_json::{json, Value};
use tempfile::TempDir;

#[test]
fn cluster_returns_ok_payload_with_job_summary() {
    with_env(&[], || {
        let workspace = Workspace::new();
        workspace.seed_embeddings();

        let result = cluster::run(&workspace.options());
        assert_eq!(result.exit_code, 0, "expected successful clustering run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "cluster");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["jobs"][0]["job"], "cluster");
        assert_eq!(payload["jobs"][0]["metrics"]["clusters"], 2.0);
        assert_eq!(payload["jobs"][0]["metrics"]["items"], 12.0);
        assert!(workspace.data_dir().join("topic_clusters_all.json").exists());
    });
}

#[test]
fn cluster_reports_precondition_failure_on_vector_mismatch() {
    with_env(&[], || {
        let workspace = Workspace::new();
        workspace.seed_embeddings();
        fs::write(workspace.embeddings_dir().join("search-embeddings.bin"), [0u8; 20])
            .expect("truncate vectors");

        let result = cluster::run(&workspace.options());
        assert_eq!(result.exit_code, 3, "expected configuration precondition exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "precondition");
        assert!(!workspace.data_dir().join("topic_clusters_all.json").exists());
    });
}

#[test]
fn recommend_reports_insufficient_data() {
    with_env(&[], || {
        let workspace = Workspace::new();
        workspace.write_json(
            "content_dwell.json",
            &json!([{"session_id": "s1", "name": "DoWhy", "dwell_ms": 1200}]),
        );
        workspace.write_json("content_clicks.json", &json!([]));

        let result = recommend::run(&workspace.options());
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "recommend");
        assert_eq!(payload["error_class"], "insufficient_data");
    });
}

#[test]
fn score_reports_input_failure_without_rankings() {
    with_env(&[], || {
        let workspace = Workspace::new();

        let result = score::run(&workspace.options());
        assert_eq!(result.exit_code, 4, "expected input failure exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "score");
        assert_eq!(payload["error_class"], "input");
    });
}

#[test]
fn score_rewrites_catalog_files_in_score_order() {
    with_env(&[], || {
        let workspace = Workspace::new();
        workspace.write_json(
            "global_rankings.json",
            &json!({"rankings": [
                {"name": "EconML", "score": 2.0},
                {"name": "DoWhy", "score": 0.5}
            ]}),
        );
        workspace.write_json(
            "packages.json",
            &json!([
                {"name": "dowhy", "category": "Causal"},
                {"name": "econml", "category": "Causal"}
            ]),
        );

        let result = score::run(&workspace.options());
        assert_eq!(result.exit_code, 0);

        let packages = workspace.read_json("packages.json");
        assert_eq!(packages[0]["name"], "econml");
        assert_eq!(packages[0]["model_score"], 2.0);
        let rankings = workspace.read_json("category_rankings.json");
        assert_eq!(rankings["packages"][0]["total_score"], 2.5);
    });
}

#[test]
fn all_stops_at_the_first_failing_job() {
    with_env(&[], || {
        let workspace = Workspace::new();
        workspace.seed_embeddings();

        let result = all::run(&workspace.options());
        assert_eq!(result.exit_code, 4, "missing dwell data should abort the run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "all");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "input");
        assert_eq!(payload["jobs"].as_array().map(Vec::len), Some(1));
        assert_eq!(payload["jobs"][0]["job"], "cluster");
        assert!(!workspace.data_dir().join("category_rankings.json").exists());
    });
}

#[test]
fn missing_explicit_config_file_is_a_config_failure() {
    with_env(&[], || {
        let options = GlobalOptions {
            config: Some(PathBuf::from("/nonexistent/curator.toml")),
            json: true,
            ..GlobalOptions::default()
        };

        let result = cluster::run(&options);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn invalid_env_override_is_a_config_failure() {
    with_env(&[("CURATOR_CLUSTERING_N_INIT", "many")], || {
        let workspace = Workspace::new();

        let result = score::run(&workspace.options());
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn config_attributes_each_value_to_its_source() {
    with_env(&[("CURATOR_CLUSTERING_SEED", "7")], || {
        let workspace = Workspace::new();
        let mut options = workspace.options();
        options.json = false;
        options.log_level = Some("debug".to_string());

        let result = config::run(&options);
        assert_eq!(result.exit_code, 0);

        let output = result.output;
        assert!(output.contains("- clustering.seed = 7 (source: env (CURATOR_CLUSTERING_SEED))"));
        assert!(output.contains("- clustering.min_clusters = 2 (source: file ("));
        assert!(output.contains("- logging.level = debug (source: cli (--log-level))"));
        assert!(output.contains("- factorization.iterations = 15 (source: default)"));
    });
}

#[test]
fn human_output_lists_highlights_and_artifacts() {
    with_env(&[], || {
        let workspace = Workspace::new();
        workspace.seed_embeddings();
        let mut options = workspace.options();
        options.json = false;

        let result = cluster::run(&options);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.starts_with("== cluster =="));
        assert!(result.output.contains("clusters=2"));
        assert!(result.output.contains("wrote "));
        assert!(result.output.contains("cluster completed:"));
    });
}

struct Workspace {
    dir: TempDir,
    config_path: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let config_path = dir.path().join("curator.toml");
        let contents = format!(
            "[paths]\ndata_dir = \"{}\"\nembeddings_dir = \"{}\"\n\n\
             [clustering]\nmin_clusters = 2\ntarget_cluster_size = 6\n\n\
             [scoring]\ncatalog_files = [\"packages.json\"]\n",
            dir.path().join("data").display(),
            dir.path().join("embeddings").display(),
        );
        fs::write(&config_path, contents).expect("write config");
        Self { dir, config_path }
    }

    fn options(&self) -> GlobalOptions {
        GlobalOptions {
            config: Some(self.config_path.clone()),
            json: true,
            ..GlobalOptions::default()
        }
    }

    fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    fn embeddings_dir(&self) -> PathBuf {
        self.dir.path().join("embeddings")
    }

    fn write_json(&self, file_name: &str, value: &Value) {
        write_file(&self.data_dir().join(file_name), &serde_json::to_vec(value).expect("json"));
    }

    fn read_json(&self, file_name: &str) -> Value {
        let raw = fs::read(self.data_dir().join(file_name)).expect("read artifact");
        serde_json::from_slice(&raw).expect("artifact json")
    }

    fn seed_embeddings(&self) {
        let mut items = Vec::new();
        let mut bytes = Vec::new();
        for index in 0..12 {
            let causal = index < 6;
            let jitter = index as f32 * 0.01;
            let vector: [f32; 3] = if causal { [1.0, jitter, 0.0] } else { [0.0, jitter, 1.0] };
            bytes.extend(vector.iter().flat_map(|value| value.to_le_bytes()));
            items.push(if causal {
                json!({
                    "id": format!("package-{index}"),
                    "category": "Causal Inference",
                    "topic_tags": "dag, iv"
                })
            } else {
                json!({
                    "id": format!("book-{index}"),
                    "category": "Pricing",
                    "topic_tags": "auctions"
                })
            });
        }
        let metadata = json!({"model": "test", "dimensions": 3, "count": 12, "items": items});
        write_file(
            &self.embeddings_dir().join("search-metadata.json"),
            &serde_json::to_vec(&metadata).expect("json"),
        );
        write_file(&self.embeddings_dir().join("search-embeddings.bin"), &bytes);
    }
}

fn write_file(path: &Path, bytes: &[u8]) {
    fs::create_dir_all(path.parent().expect("parent dir")).expect("mkdir");
    fs::write(path, bytes).expect("write fixture");
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CURATOR_DATA_DIR",
        "CURATOR_EMBEDDINGS_DIR",
        "CURATOR_CLUSTERING_TARGET_SIZE",
        "CURATOR_CLUSTERING_MIN_CLUSTERS",
        "CURATOR_CLUSTERING_N_INIT",
        "CURATOR_CLUSTERING_SEED",
        "CURATOR_FACTORIZATION_ITERATIONS",
        "CURATOR_FACTORIZATION_REGULARIZATION",
        "CURATOR_FACTORIZATION_MIN_DWELL_RECORDS",
        "CURATOR_FACTORIZATION_SEED",
        "CURATOR_LOGGING_LEVEL",
        "CURATOR_LOGGING_FORMAT",
        "CURATOR_LOG_LEVEL",
        "CURATOR_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}
