//! Public output types for kata command responses.
//!
//! Commands that act on several pipelines at once report through
//! [`BulkResult`]; single-pipeline commands return their item directly.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Hint};

/// Standardized bulk execution result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResult<T: Serialize> {
    pub action: String,
    pub results: Vec<ItemOutcome<T>>,
    pub summary: BulkSummary,
}

/// Outcome for a single item in a bulk operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome<T: Serialize> {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(flatten)]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Structured error details, e.g. the compiler's stdout and stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
}

/// Summary of bulk operation results.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items never attempted because an earlier item failed.
    pub skipped: usize,
}

impl<T: Serialize> BulkResult<T> {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            results: Vec::new(),
            summary: BulkSummary::default(),
        }
    }

    pub fn record_success(&mut self, id: String, result: T) {
        self.summary.total += 1;
        self.summary.succeeded += 1;
        self.results.push(ItemOutcome {
            id,
            result: Some(result),
            error: None,
            error_code: None,
            details: None,
            hints: Vec::new(),
        });
    }

    pub fn record_failure(&mut self, id: String, err: &Error) {
        self.summary.total += 1;
        self.summary.failed += 1;
        self.results.push(ItemOutcome {
            id,
            result: None,
            error: Some(err.message.clone()),
            error_code: Some(err.code.as_str().to_string()),
            details: Some(err.details.clone()),
            hints: err.hints.clone(),
        });
    }

    pub fn record_skipped(&mut self, count: usize) {
        self.summary.total += count;
        self.summary.skipped += count;
    }
}
