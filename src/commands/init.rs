use clap::Args;
use serde::Serialize;

use kata::defaults;
use kata::error::Error;
use kata::io::write_file_atomic;
use kata::{manifest, paths};

use super::{CmdResult, GlobalArgs};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing manifest
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOutput {
    pub command: &'static str,
    pub path: String,
    pub pipelines: Vec<String>,
    pub next_steps: Vec<String>,
}

/// Write the starter manifest to `--manifest` or `./Kata.toml`.
pub fn run(args: InitArgs, global: &GlobalArgs) -> CmdResult<InitOutput> {
    let path = match &global.manifest {
        Some(raw) => paths::expand(raw),
        None => paths::cwd()?.join(defaults::MANIFEST_FILE),
    };

    if path.exists() && !args.force {
        return Err(Error::config_already_exists(path.to_string_lossy()));
    }

    write_file_atomic(&path, defaults::STARTER_MANIFEST, "write manifest")?;
    let loaded = manifest::load(&path)?;

    Ok((
        InitOutput {
            command: "init",
            path: path.to_string_lossy().to_string(),
            pipelines: loaded.pipeline_ids(),
            next_steps: vec![
                "Put each kata source next to its pipeline dir (chop/chop1.rs, kata2/chop.rs)"
                    .to_string(),
                "Build everything: kata build".to_string(),
                "Build test executables: kata test".to_string(),
            ],
        },
        0,
    ))
}
