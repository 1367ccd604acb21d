//! Build, test and clean for a single kata.
//!
//! A [`Pipeline`] is one source file plus where its two executables live.
//! The three [`Step`]s are the only operations; each runs synchronously and
//! stops at the first failure.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{self, BuildCache, CacheEntry};
use crate::error::{Error, ErrorCode, Result};
use crate::toolchain::{CompileMode, CompileRequest, Toolchain};
use crate::utils::command::CapturedOutput;
use crate::utils::io::{remove_dir_all_if_exists, remove_file_if_exists};
use crate::utils::shell;
use crate::utils::validation::is_contained_relative;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub id: String,
    /// Absolute (or manifest-relative) directory every other path hangs off.
    pub root: PathBuf,
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub binary: String,
    pub test_binary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl Pipeline {
    pub fn source_path(&self) -> PathBuf {
        self.root.join(&self.source)
    }

    pub fn output_dir_path(&self) -> PathBuf {
        self.root.join(&self.output_dir)
    }

    pub fn binary_path(&self) -> PathBuf {
        self.output_dir_path().join(&self.binary)
    }

    pub fn test_binary_path(&self) -> PathBuf {
        self.output_dir_path().join(&self.test_binary)
    }

    fn artifact_name(&self, mode: CompileMode) -> &str {
        match mode {
            CompileMode::Release => &self.binary,
            CompileMode::Test => &self.test_binary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Build,
    Test,
    Clean,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Build => "build",
            Step::Test => "test",
            Step::Clean => "clean",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Built,
    UpToDate,
    Cleaned,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutput {
    pub pipeline_id: String,
    pub step: Step,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>,
    #[serde(flatten)]
    pub output: CapturedOutput,
}

/// Collaborators a step runs against.
pub struct PipelineContext<'a> {
    pub toolchain: &'a dyn Toolchain,
    pub cache: &'a mut dyn BuildCache,
}

/// Run `step` for `pipeline`.
pub fn run_step(step: Step, pipeline: &Pipeline, ctx: &mut PipelineContext) -> Result<StepOutput> {
    match step {
        Step::Build => build(pipeline, ctx),
        Step::Test => test(pipeline, ctx),
        Step::Clean => clean(pipeline, ctx.cache),
    }
}

/// Ensure the output directory exists.
///
/// An existing directory is fine; an existing file at that path, or any other
/// creation error, is a setup failure.
pub fn init_output_dir(pipeline: &Pipeline) -> Result<PathBuf> {
    let dir = pipeline.output_dir_path();
    let display = dir.to_string_lossy().to_string();

    match fs::create_dir_all(&dir) {
        Ok(()) if dir.is_dir() => Ok(dir),
        Ok(()) => Err(Error::setup_output_dir_failed(
            display,
            "path exists but is not a directory",
        )),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(Error::setup_output_dir_failed(
            display,
            "path exists but is not a directory",
        )),
        Err(e) => Err(Error::setup_output_dir_failed(display, e.to_string())),
    }
}

/// Compile the production executable.
pub fn build(pipeline: &Pipeline, ctx: &mut PipelineContext) -> Result<StepOutput> {
    compile_artifact(pipeline, ctx, Step::Build, CompileMode::Release)
}

/// Compile the test executable. Running it is left to the caller.
pub fn test(pipeline: &Pipeline, ctx: &mut PipelineContext) -> Result<StepOutput> {
    compile_artifact(pipeline, ctx, Step::Test, CompileMode::Test)
}

fn compile_artifact(
    pipeline: &Pipeline,
    ctx: &mut PipelineContext,
    step: Step,
    mode: CompileMode,
) -> Result<StepOutput> {
    let source = pipeline.source_path();
    if !source.is_file() {
        return Err(Error::source_not_found(
            &pipeline.id,
            source.to_string_lossy(),
        ));
    }

    init_output_dir(pipeline)?;

    let name = pipeline.artifact_name(mode);
    let target = pipeline.output_dir.join(name);
    let staging = pipeline.output_dir.join(format!(".{}.partial", name));

    let request = CompileRequest {
        pipeline_id: &pipeline.id,
        working_dir: &pipeline.root,
        source: &pipeline.source,
        mode,
        output: &target,
        extra_args: &pipeline.args,
    };
    let command = shell::quote_args(&ctx.toolchain.command_line(&request));
    let artifact = pipeline.root.join(&target).to_string_lossy().to_string();

    let identity = if ctx.cache.is_enabled() {
        let identity = ctx.toolchain.identity()?;
        if let Some(entry) = ctx.cache.lookup(&command) {
            if cache::is_fresh(entry, &identity, &pipeline.root) {
                log_status!("kata", "{} {}: up to date ({})", step.as_str(), pipeline.id, artifact);
                return Ok(StepOutput {
                    pipeline_id: pipeline.id.clone(),
                    step,
                    status: StepStatus::UpToDate,
                    artifact: Some(artifact),
                    command: Some(command),
                    removed: Vec::new(),
                    output: CapturedOutput::default(),
                });
            }
        }
        Some(identity)
    } else {
        None
    };

    log_status!("kata", "{} {}: {}", step.as_str(), pipeline.id, command);

    let output = match ctx.toolchain.compile(&request.with_output(&staging)) {
        Ok(output) => output,
        Err(mut err) => {
            discard_staging(pipeline, &staging);
            // Report the command for the real target, not the staging path.
            if err.code == ErrorCode::ToolchainCompileFailed {
                if let Some(details) = err.details.as_object_mut() {
                    details.insert("command".to_string(), Value::String(command.clone()));
                }
            }
            return Err(err);
        }
    };

    if !output.is_empty() {
        log_status!(
            "kata",
            "{} {}: compiler output\n{}{}",
            step.as_str(),
            pipeline.id,
            output.stdout,
            output.stderr
        );
    }

    if let Err(e) = fs::rename(pipeline.root.join(&staging), pipeline.root.join(&target)) {
        discard_staging(pipeline, &staging);
        return Err(Error::internal_io(
            e.to_string(),
            Some(format!("move {} into place", target.display())),
        ));
    }

    if let Some(identity) = identity {
        let inputs = cache::snapshot(&pipeline.root, &[&pipeline.source])
            .map_err(|e| Error::internal_io(e.to_string(), Some("fingerprint source".into())))?;
        let outputs = cache::snapshot(&pipeline.root, &[&target])
            .map_err(|e| Error::internal_io(e.to_string(), Some("fingerprint artifact".into())))?;
        ctx.cache
            .record(command.clone(), CacheEntry::new(identity, inputs, outputs))?;
    }

    Ok(StepOutput {
        pipeline_id: pipeline.id.clone(),
        step,
        status: StepStatus::Built,
        artifact: Some(artifact),
        command: Some(command),
        removed: Vec::new(),
        output,
    })
}

/// A failed compile must never leave a half-written executable behind.
fn discard_staging(pipeline: &Pipeline, staging: &Path) {
    let path = pipeline.root.join(staging);
    if let Err(e) = remove_file_if_exists(&path) {
        log_status!("kata", "{}: could not remove {}: {}", pipeline.id, path.display(), e);
    }
}

/// Remove every tracked artifact, forget the cache, then delete the output
/// directory. Anything already gone is skipped silently.
pub fn clean(pipeline: &Pipeline, cache: &mut dyn BuildCache) -> Result<StepOutput> {
    let mut removed = Vec::new();

    for rel in cache.tracked_outputs() {
        if !is_contained_relative(Path::new(&rel)) {
            log_status!("kata", "clean {}: ignoring untracked path {}", pipeline.id, rel);
            continue;
        }
        let path = pipeline.root.join(&rel);
        let gone = remove_file_if_exists(&path)
            .map_err(|e| Error::clean_remove_failed(path.to_string_lossy(), e.to_string()))?;
        if gone {
            removed.push(path.to_string_lossy().to_string());
        }
    }

    cache.clear()?;

    let dir = pipeline.output_dir_path();
    let gone = remove_dir_all_if_exists(&dir)
        .map_err(|e| Error::clean_remove_failed(dir.to_string_lossy(), e.to_string()))?;
    if gone {
        removed.push(dir.to_string_lossy().to_string());
    }

    log_status!("kata", "clean {}: removed {} path(s)", pipeline.id, removed.len());

    Ok(StepOutput {
        pipeline_id: pipeline.id.clone(),
        step: Step::Clean,
        status: StepStatus::Cleaned,
        artifact: None,
        command: None,
        removed,
        output: CapturedOutput::default(),
    })
}
