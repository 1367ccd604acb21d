use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigNotFound,
    ConfigInvalidToml,
    ConfigInvalidValue,
    ConfigAlreadyExists,

    ValidationInvalidArgument,

    PipelineNotFound,
    PipelineSourceNotFound,

    SetupOutputDirFailed,
    CleanRemoveFailed,

    ToolchainNotFound,
    ToolchainCompileFailed,

    CacheCorrupt,

    InternalIoError,
    InternalJsonError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigNotFound => "config.not_found",
            ErrorCode::ConfigInvalidToml => "config.invalid_toml",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",
            ErrorCode::ConfigAlreadyExists => "config.already_exists",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::PipelineNotFound => "pipeline.not_found",
            ErrorCode::PipelineSourceNotFound => "pipeline.source_not_found",

            ErrorCode::SetupOutputDirFailed => "setup.output_dir_failed",
            ErrorCode::CleanRemoveFailed => "clean.remove_failed",

            ErrorCode::ToolchainNotFound => "toolchain.not_found",
            ErrorCode::ToolchainCompileFailed => "toolchain.compile_failed",

            ErrorCode::CacheCorrupt => "cache.corrupt",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Detail payloads
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigNotFoundDetails {
    pub searched: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidTomlDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundDetails {
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathFailureDetails {
    pub path: String,
    pub error: String,
}

/// Everything the compiler said, passed through untouched.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileFailedDetails {
    pub pipeline_id: String,
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolchainNotFoundDetails {
    pub program: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn config_not_found(searched: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            "No Kata.toml manifest found",
            to_details(ConfigNotFoundDetails { searched }),
        )
        .with_hint("Run 'kata init' to write a starter manifest")
        .with_hint("Or point at one explicitly: kata --manifest <path> <command>")
    }

    pub fn config_invalid_toml(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidToml,
            "Invalid TOML in manifest",
            to_details(ConfigInvalidTomlDetails {
                path: path.into(),
                error: err.to_string(),
            }),
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let problem = problem.into();
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid manifest value: {}", problem),
            to_details(ConfigInvalidValueDetails {
                key: key.into(),
                value,
                problem,
            }),
        )
    }

    pub fn config_already_exists(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::ConfigAlreadyExists,
            format!("Manifest already exists at {}", path),
            serde_json::json!({ "path": path }),
        )
        .with_hint("Re-run with --force to overwrite it")
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            to_details(InvalidArgumentDetails {
                field: field.into(),
                problem: problem.into(),
                id,
                tried,
            }),
        )
    }

    pub fn pipeline_not_found(id: impl Into<String>, available: Vec<String>) -> Self {
        let id = id.into();
        Self::new(
            ErrorCode::PipelineNotFound,
            format!("No pipeline matches '{}'", id),
            to_details(NotFoundDetails { id, available }),
        )
        .with_hint("Run 'kata list' to see declared pipelines")
    }

    pub fn source_not_found(pipeline_id: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::PipelineSourceNotFound,
            format!("Source file not found: {}", path),
            serde_json::json!({ "pipelineId": pipeline_id.into(), "path": path }),
        )
    }

    pub fn setup_output_dir_failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::SetupOutputDirFailed,
            format!("Cannot create output directory {}", path),
            to_details(PathFailureDetails {
                path,
                error: error.into(),
            }),
        )
    }

    pub fn clean_remove_failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::CleanRemoveFailed,
            format!("Cannot remove {}", path),
            to_details(PathFailureDetails {
                path,
                error: error.into(),
            }),
        )
    }

    pub fn toolchain_not_found(program: impl Into<String>, error: impl Into<String>) -> Self {
        let program = program.into();
        Self::new(
            ErrorCode::ToolchainNotFound,
            format!("Failed to run toolchain '{}'", program),
            to_details(ToolchainNotFoundDetails {
                program,
                error: error.into(),
            }),
        )
        .with_hint("Check [toolchain].program in Kata.toml and that it is on PATH")
    }

    pub fn compile_failed(details: CompileFailedDetails) -> Self {
        let message = format!(
            "Compilation failed for '{}' (exit code {})",
            details.pipeline_id, details.exit_code
        );
        Self::new(
            ErrorCode::ToolchainCompileFailed,
            message,
            to_details(details),
        )
    }

    pub fn cache_corrupt(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        let path = path.into();
        let hint = format!("Delete {} and rebuild", path);
        Self::new(
            ErrorCode::CacheCorrupt,
            "Build cache file is unreadable",
            to_details(PathFailureDetails {
                path,
                error: err.to_string(),
            }),
        )
        .with_hint(hint)
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            to_details(InternalIoErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            to_details(InternalJsonErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_failed_keeps_diagnostics_verbatim() {
        let err = Error::compile_failed(CompileFailedDetails {
            pipeline_id: "chop".to_string(),
            command: "rustc chop1.rs -o bin/chop1".to_string(),
            exit_code: 1,
            stdout: String::new(),
            stderr: "error[E0425]: cannot find value `x`\n  --> chop1.rs:3:5\n".to_string(),
        });

        assert_eq!(err.code.as_str(), "toolchain.compile_failed");
        assert_eq!(
            err.details["stderr"],
            "error[E0425]: cannot find value `x`\n  --> chop1.rs:3:5\n"
        );
        assert_eq!(err.details["exitCode"], 1);
    }

    #[test]
    fn pipeline_not_found_lists_available_ids() {
        let err = Error::pipeline_not_found("chopp", vec!["chop".into(), "kata2".into()]);
        assert_eq!(err.details["available"][1], "kata2");
        assert_eq!(err.hints.len(), 1);
    }

    #[test]
    fn with_hint_appends() {
        let err = Error::internal_io("boom", None).with_hint("a").with_hint("b");
        let hints: Vec<_> = err.hints.iter().map(|h| h.message.as_str()).collect();
        assert_eq!(hints, vec!["a", "b"]);
    }
}
