//! Input validation primitives.

use std::path::{Component, Path};

use crate::error::{Error, Result};

/// Require a string to be non-empty after trimming.
///
/// Returns a reference to the trimmed string on success.
pub fn require_non_empty<'a>(value: &'a str, field: &str, message: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation_invalid_argument(field, message, None, None))
    } else {
        Ok(trimmed)
    }
}

/// True when `path` is relative and made only of normal components.
///
/// Rejects `""`, `"."`, `".."`, `"a/../b"` and anything absolute, so a path
/// that passes can be joined onto a root without escaping or aliasing it.
pub fn is_contained_relative(path: &Path) -> bool {
    let mut components = path.components().peekable();
    if components.peek().is_none() {
        return false;
    }
    components.all(|c| matches!(c, Component::Normal(_)))
}

/// True when `name` is a bare file name with no directory part.
pub fn is_plain_file_name(name: &str) -> bool {
    let path = Path::new(name);
    path.components().count() == 1 && matches!(path.components().next(), Some(Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_non_empty_trims_whitespace() {
        let result = require_non_empty("  hello  ", "field", "msg");
        assert_eq!(result.unwrap(), "hello");
    }

    #[test]
    fn require_non_empty_fails_for_whitespace_only() {
        let result = require_non_empty("   ", "field", "Cannot be empty");
        assert!(result.is_err());
    }

    #[test]
    fn contained_relative_accepts_nested_dirs() {
        assert!(is_contained_relative(Path::new("bin")));
        assert!(is_contained_relative(Path::new("target/bin")));
    }

    #[test]
    fn contained_relative_rejects_escapes_and_roots() {
        assert!(!is_contained_relative(Path::new("")));
        assert!(!is_contained_relative(Path::new(".")));
        assert!(!is_contained_relative(Path::new("..")));
        assert!(!is_contained_relative(Path::new("bin/../..")));
        assert!(!is_contained_relative(Path::new("/tmp/bin")));
    }

    #[test]
    fn plain_file_name_rejects_paths() {
        assert!(is_plain_file_name("chop1"));
        assert!(is_plain_file_name("test_chop1"));
        assert!(!is_plain_file_name("bin/chop1"));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name(""));
    }
}
