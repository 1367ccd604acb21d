//! Built-in defaults for manifests and the starter manifest `kata init` writes.

/// Manifest file name looked up by discovery.
pub const MANIFEST_FILE: &str = "Kata.toml";

/// Build-cache file written into each pipeline root.
pub const CACHE_FILE: &str = ".kata-deps.json";

pub const TOOLCHAIN_PROGRAM: &str = "rustc";

pub const OUTPUT_DIR: &str = "bin";

/// Prefix for the test executable when `test_binary` is not configured.
pub const TEST_BINARY_PREFIX: &str = "test_";

/// Starter manifest declaring the two binary-chop katas.
pub const STARTER_MANIFEST: &str = r#"# Pipelines built by `kata build`, `kata test` and `kata clean`.

[toolchain]
program = "rustc"
args = []

[cache]
enabled = true
file = ".kata-deps.json"

[[pipeline]]
id = "chop"
dir = "chop"
source = "chop1.rs"
output_dir = "bin"
binary = "chop1"
test_binary = "test_chop1"

[[pipeline]]
id = "kata2"
dir = "kata2"
source = "chop.rs"
output_dir = "bin"
binary = "chop"
test_binary = "test"
"#;
