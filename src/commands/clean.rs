use kata::pipeline::Step;
use kata::runner::StepResult;

use super::{CmdResult, GlobalArgs, StepArgs};

pub type CleanArgs = StepArgs;

pub fn run(args: CleanArgs, global: &GlobalArgs) -> CmdResult<StepResult> {
    super::run_step(Step::Clean, args, global)
}
