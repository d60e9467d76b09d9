use curator_core::config::AppConfig;
use curator_core::pipeline::{CLUSTER_JOB, RECOMMEND_JOB, SCORE_JOB};
use curator_core::{build_recommendations, cluster_topics, inject_scores, JobSummary, PipelineError};

use super::{CommandResult, GlobalOptions};

pub const ALL_COMMAND: &str = "all";

type Job = fn(&AppConfig) -> Result<JobSummary, PipelineError>;

const JOBS: [(&str, Job); 3] = [
    (CLUSTER_JOB, cluster_topics),
    (RECOMMEND_JOB, build_recommendations),
    (SCORE_JOB, inject_scores),
];

/// Runs every job against one loaded config. The first fatal error stops the
/// run and later jobs are not attempted.
pub fn run(options: &GlobalOptions) -> CommandResult {
    let config = match options.load_config(ALL_COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let mut completed = Vec::with_capacity(JOBS.len());
    for (name, job) in JOBS {
        match job(&config) {
            Ok(summary) => completed.push(summary),
            Err(error) => {
                tracing::error!(
                    event_name = "cli.all.aborted",
                    correlation_id = name,
                    error_class = error.error_class(),
                    error = %error,
                    "job failed, skipping remaining jobs"
                );
                return CommandResult::failure_after(
                    ALL_COMMAND,
                    error.error_class(),
                    format!("{name}: {error}"),
                    error.exit_code(),
                    completed,
                    options.json,
                );
            }
        }
    }

    let warnings: usize = completed.iter().map(|summary| summary.quality.total()).sum();
    let message =
        format!("{} jobs completed with {warnings} data quality warnings", completed.len());
    CommandResult::success(ALL_COMMAND, message, completed, options.json)
}
