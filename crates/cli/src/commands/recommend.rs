use curator_core::build_recommendations;
use curator_core::pipeline::RECOMMEND_JOB;

use super::{run_job, CommandResult, GlobalOptions};

pub fn run(options: &GlobalOptions) -> CommandResult {
    run_job(RECOMMEND_JOB, options, build_recommendations)
}
