//! CLI response formatting and output.
//!
//! Provides JSON envelope, printing, and exit code mapping.

use kata::error::Hint;
use kata::{Error, ErrorCode, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(()); // Exit gracefully on SIGPIPE
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    match result {
        Ok(data) => print_response(&CliResponse::success(data)),
        Err(err) => print_response(&CliResponse::<()>::from_error(&err)),
    }
}

pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

pub fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigInvalidToml
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ConfigAlreadyExists
        | ErrorCode::ValidationInvalidArgument
        | ErrorCode::CacheCorrupt => 2,

        ErrorCode::ConfigNotFound
        | ErrorCode::PipelineNotFound
        | ErrorCode::PipelineSourceNotFound => 4,

        ErrorCode::SetupOutputDirFailed | ErrorCode::CleanRemoveFailed => 10,

        ErrorCode::ToolchainNotFound | ErrorCode::ToolchainCompileFailed => 20,

        ErrorCode::InternalIoError | ErrorCode::InternalJsonError => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kata::error::CompileFailedDetails;

    fn compile_error() -> Error {
        Error::compile_failed(CompileFailedDetails {
            pipeline_id: "chop".to_string(),
            command: "rustc chop1.rs -o bin/chop1".to_string(),
            exit_code: 1,
            stdout: String::new(),
            stderr: "error: expected one of `!` or `::`".to_string(),
        })
    }

    #[test]
    fn compile_failure_serializes_diagnostics() {
        let json = CliResponse::<()>::from_error(&compile_error())
            .to_json()
            .unwrap();

        assert!(json.contains("\"code\": \"toolchain.compile_failed\""));
        assert!(json.contains("expected one of `!` or `::`"));
        assert!(json.contains("\"exitCode\": 1"));
        assert!(json.contains("\"success\": false"));
    }

    #[test]
    fn compile_failure_maps_to_exit_code_20() {
        let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(compile_error()));
        assert_eq!(exit_code, 20);
    }

    #[test]
    fn setup_and_clean_failures_map_to_exit_code_10() {
        let setup = Error::setup_output_dir_failed("bin", "permission denied");
        let clean = Error::clean_remove_failed("bin", "permission denied");
        assert_eq!(exit_code_for_error(setup.code), 10);
        assert_eq!(exit_code_for_error(clean.code), 10);
    }

    #[test]
    fn success_envelope_carries_data_and_exit_code() {
        let (value, exit_code) = map_cmd_result_to_json(Ok((serde_json::json!({"id": "chop"}), 0)));
        assert_eq!(exit_code, 0);
        let json = CliResponse::success(value.unwrap()).to_json().unwrap();
        assert!(json.contains("\"success\": true"));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn hints_are_omitted_when_empty() {
        let json = CliResponse::<()>::from_error(&Error::internal_io("x", None))
            .to_json()
            .unwrap();
        assert!(!json.contains("hints"));
    }
}
