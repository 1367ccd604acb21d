use kata::pipeline::Step;
use kata::runner::StepResult;

use super::{CmdResult, GlobalArgs, StepArgs};

pub type BuildArgs = StepArgs;

/// Compile the production executable of each selected pipeline.
pub fn run(args: BuildArgs, global: &GlobalArgs) -> CmdResult<StepResult> {
    super::run_step(Step::Build, args, global)
}
