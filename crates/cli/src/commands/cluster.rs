use curator_core::cluster_topics;
use curator_core::pipeline::CLUSTER_JOB;

use super::{run_job, CommandResult, GlobalOptions};

pub fn run(options: &GlobalOptions) -> CommandResult {
    run_job(CLUSTER_JOB, options, cluster_topics)
}
