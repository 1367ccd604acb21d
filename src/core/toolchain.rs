//! The external compiler as an explicit collaborator.
//!
//! Pipelines never spawn processes themselves; they hand a [`CompileRequest`]
//! to a [`Toolchain`]. [`Rustc`] is the real implementation, tests substitute
//! fakes that succeed or fail deterministically.

use std::path::Path;
use std::sync::OnceLock;

use serde::Serialize;

use crate::error::{CompileFailedDetails, Error, Result};
use crate::utils::command::{self, CapturedOutput};
use crate::utils::shell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileMode {
    /// Production executable.
    Release,
    /// Test-harness executable (`--test`).
    Test,
}

/// One compilation. Paths are relative to `working_dir`.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub pipeline_id: &'a str,
    pub working_dir: &'a Path,
    pub source: &'a Path,
    pub mode: CompileMode,
    pub output: &'a Path,
    pub extra_args: &'a [String],
}

impl<'a> CompileRequest<'a> {
    /// Same request, writing somewhere else.
    pub fn with_output(self, output: &'a Path) -> Self {
        Self { output, ..self }
    }
}

pub trait Toolchain {
    /// Stable description of the compiler (name and version). Part of every
    /// build-cache record, so upgrading the compiler invalidates artifacts.
    fn identity(&self) -> Result<String>;

    /// Full argv, program first.
    fn command_line(&self, request: &CompileRequest) -> Vec<String>;

    /// Run the compiler. `Ok` means exit status zero and the executable was
    /// written to `request.output`; the captured output carries warnings.
    fn compile(&self, request: &CompileRequest) -> Result<CapturedOutput>;
}

/// `rustc <source> [--test] -o <output> [args...]`
#[derive(Debug)]
pub struct Rustc {
    program: String,
    identity: OnceLock<String>,
}

impl Rustc {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            identity: OnceLock::new(),
        }
    }
}

impl Toolchain for Rustc {
    fn identity(&self) -> Result<String> {
        if let Some(identity) = self.identity.get() {
            return Ok(identity.clone());
        }

        let version = command::run(&self.program, &["--version"], "toolchain --version")
            .map_err(|e| Error::toolchain_not_found(&self.program, e.details.to_string()))?;
        Ok(self.identity.get_or_init(|| version).clone())
    }

    fn command_line(&self, request: &CompileRequest) -> Vec<String> {
        let mut argv = vec![
            self.program.clone(),
            request.source.to_string_lossy().to_string(),
        ];
        if request.mode == CompileMode::Test {
            argv.push("--test".to_string());
        }
        argv.push("-o".to_string());
        argv.push(request.output.to_string_lossy().to_string());
        argv.extend(request.extra_args.iter().cloned());
        argv
    }

    fn compile(&self, request: &CompileRequest) -> Result<CapturedOutput> {
        let argv = self.command_line(request);

        let output = command::capture_in(request.working_dir, &argv[0], &argv[1..])
            .map_err(|e| Error::toolchain_not_found(&self.program, e.to_string()))?;

        if !output.success {
            return Err(Error::compile_failed(CompileFailedDetails {
                pipeline_id: request.pipeline_id.to_string(),
                command: shell::quote_args(&argv),
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            }));
        }

        Ok(CapturedOutput::new(output.stdout, output.stderr))
    }
}
