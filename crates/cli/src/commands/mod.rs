pub mod all;
pub mod cluster;
pub mod config;
pub mod recommend;
pub mod score;

use std::path::PathBuf;

use curator_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use curator_core::{JobSummary, PipelineError};
use serde::Serialize;

/// Exit code for configuration files or environment overrides that fail to load.
pub const CONFIG_EXIT_CODE: u8 = 2;

#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub json: bool,
}

impl GlobalOptions {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                data_dir: self.data_dir.clone(),
                log_level: self.log_level.clone(),
                log_format: None,
            },
        }
    }

    pub fn load_config(&self, command: &str) -> Result<AppConfig, CommandResult> {
        AppConfig::load(self.load_options()).map_err(|error| {
            CommandResult::failure(
                command,
                "config_validation",
                format!("config validation failed: {error}"),
                CONFIG_EXIT_CODE,
                self.json,
            )
        })
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    jobs: Vec<JobSummary>,
}

impl CommandResult {
    pub fn success(
        command: &str,
        message: impl Into<String>,
        jobs: Vec<JobSummary>,
        json: bool,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            jobs,
        };
        Self { exit_code: 0, output: render(payload, json) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        json: bool,
    ) -> Self {
        Self::failure_after(command, error_class, message, exit_code, Vec::new(), json)
    }

    /// Failure that still reports the jobs which completed before it.
    pub fn failure_after(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        jobs: Vec<JobSummary>,
        json: bool,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            jobs,
        };
        Self { exit_code, output: render(payload, json) }
    }

    pub fn from_pipeline_error(command: &str, error: &PipelineError, json: bool) -> Self {
        Self::failure(command, error.error_class(), error.to_string(), error.exit_code(), json)
    }
}

/// Loads config and runs one job, mapping both failure kinds to exit codes.
pub(crate) fn run_job(
    command: &str,
    options: &GlobalOptions,
    job: fn(&AppConfig) -> Result<JobSummary, PipelineError>,
) -> CommandResult {
    let config = match options.load_config(command) {
        Ok(config) => config,
        Err(result) => return result,
    };

    match job(&config) {
        Ok(summary) => {
            let message = format!("{command} completed: {}", summary.quality.summary_line());
            CommandResult::success(command, message, vec![summary], options.json)
        }
        Err(error) => {
            tracing::error!(
                event_name = "cli.job.failed",
                correlation_id = command,
                error_class = error.error_class(),
                error = %error,
                "job failed"
            );
            CommandResult::from_pipeline_error(command, &error, options.json)
        }
    }
}

fn render(payload: CommandOutcome, json: bool) -> String {
    if json {
        serialize_payload(&payload)
    } else {
        render_human(&payload)
    }
}

fn render_human(payload: &CommandOutcome) -> String {
    let mut lines = Vec::new();
    for summary in &payload.jobs {
        lines.push(format!("== {} ==", summary.job));
        let metrics: Vec<String> = summary
            .metrics
            .iter()
            .map(|(name, value)| format!("{name}={}", format_metric(*value)))
            .collect();
        if !metrics.is_empty() {
            lines.push(metrics.join(" "));
        }
        lines.extend(summary.highlights.iter().cloned());
        for path in &summary.artifacts {
            lines.push(format!("wrote {}", path.display()));
        }
    }

    match &payload.error_class {
        Some(error_class) => {
            lines.push(format!("{} failed [{error_class}]: {}", payload.command, payload.message))
        }
        None => lines.push(payload.message.clone()),
    }
    lines.join("\n")
}

fn format_metric(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.4}")
    }
}

fn serialize_payload(payload: &CommandOutcome) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        serde_json::json!({
            "command": "unknown",
            "status": "error",
            "error_class": "serialization",
            "message": error.to_string(),
        })
        .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::{format_metric, CommandResult};

    #[test]
    fn failure_payload_carries_error_class_and_exit_code() {
        let result = CommandResult::failure("score", "input", "missing rankings", 4, true);
        assert_eq!(result.exit_code, 4);

        let payload: serde_json::Value =
            serde_json::from_str(&result.output).expect("payload should be json");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "input");
        assert!(payload.get("jobs").is_none());
    }

    #[test]
    fn human_output_names_the_failure() {
        let result = CommandResult::failure("cluster", "precondition", "row mismatch", 3, false);
        assert_eq!(result.output, "cluster failed [precondition]: row mismatch");
    }

    #[test]
    fn whole_metrics_render_without_decimals() {
        assert_eq!(format_metric(12.0), "12");
        assert_eq!(format_metric(0.123_456), "0.1235");
    }
}
