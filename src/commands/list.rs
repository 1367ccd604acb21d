use clap::Args;
use serde::Serialize;

use kata::pipeline::Pipeline;

use super::{CmdResult, GlobalArgs};

#[derive(Args, Debug)]
pub struct ListArgs {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOutput {
    pub command: &'static str,
    pub manifest: String,
    pub pipelines: Vec<PipelineStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    pub id: String,
    pub source: ArtifactState,
    pub output_dir: ArtifactState,
    pub binary: ArtifactState,
    pub test_binary: ArtifactState,
}

#[derive(Debug, Serialize)]
pub struct ArtifactState {
    pub path: String,
    pub exists: bool,
}

impl ArtifactState {
    fn of(path: std::path::PathBuf) -> Self {
        Self {
            exists: path.exists(),
            path: path.to_string_lossy().to_string(),
        }
    }
}

impl From<&Pipeline> for PipelineStatus {
    fn from(p: &Pipeline) -> Self {
        Self {
            id: p.id.clone(),
            source: ArtifactState::of(p.source_path()),
            output_dir: ArtifactState::of(p.output_dir_path()),
            binary: ArtifactState::of(p.binary_path()),
            test_binary: ArtifactState::of(p.test_binary_path()),
        }
    }
}

pub fn run(_args: ListArgs, global: &GlobalArgs) -> CmdResult<ListOutput> {
    let loaded = global.load_manifest()?;

    Ok((
        ListOutput {
            command: "list",
            manifest: loaded.path.to_string_lossy().to_string(),
            pipelines: loaded.pipelines.iter().map(PipelineStatus::from).collect(),
        },
        0,
    ))
}
