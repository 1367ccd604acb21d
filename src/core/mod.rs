// Public modules
pub mod cache;
pub mod error;
pub mod manifest;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod runner;
pub mod toolchain;

// Internal modules - not part of public API
pub(crate) mod slugify;

// Public modules for CLI access
pub mod defaults;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
pub use output::{BulkResult, BulkSummary, ItemOutcome};
