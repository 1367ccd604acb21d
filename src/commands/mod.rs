use clap::Args;

use kata::manifest::{self, LoadedManifest};
use kata::pipeline::Step;
use kata::runner::{self, RunOptions, StepResult};

pub type CmdResult<T> = kata::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    /// Explicit manifest path; discovery walks up from the cwd otherwise.
    pub manifest: Option<String>,
    pub no_cache: bool,
}

impl GlobalArgs {
    pub fn load_manifest(&self) -> kata::Result<LoadedManifest> {
        manifest::discover(self.manifest.as_deref())
    }
}

/// Arguments shared by the build, test and clean steps.
#[derive(Args, Debug, Default)]
pub struct StepArgs {
    /// Pipeline IDs or glob patterns (default: every pipeline in the manifest)
    pub pipelines: Vec<String>,

    /// Keep going after a pipeline fails instead of stopping
    #[arg(long, short = 'k')]
    pub keep_going: bool,
}

/// Load the manifest and apply `step` to the selected pipelines.
pub(crate) fn run_step(step: Step, args: StepArgs, global: &GlobalArgs) -> CmdResult<StepResult> {
    let loaded = global.load_manifest()?;
    runner::run(
        step,
        &loaded,
        &args.pipelines,
        RunOptions {
            use_cache: !global.no_cache,
            keep_going: args.keep_going,
        },
    )
}

pub mod build;
pub mod clean;
pub mod init;
pub mod list;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (kata::Result<serde_json::Value>, i32) {
    crate::tty::status("kata is working...");

    match command {
        crate::Commands::Build(args) => dispatch!(args, global, build),
        crate::Commands::Test(args) => dispatch!(args, global, test),
        crate::Commands::Clean(args) => dispatch!(args, global, clean),
        crate::Commands::List(args) => dispatch!(args, global, list),
        crate::Commands::Init(args) => dispatch!(args, global, init),
    }
}
