use curator_core::inject_scores;
use curator_core::pipeline::SCORE_JOB;

use super::{run_job, CommandResult, GlobalOptions};

pub fn run(options: &GlobalOptions) -> CommandResult {
    run_job(SCORE_JOB, options, inject_scores)
}
