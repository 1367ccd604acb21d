//! `Kata.toml` loading and validation.
//!
//! The manifest is the declarative replacement for one build script per kata:
//! each `[[pipeline]]` table names a source file and where its executables go.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};
use crate::paths;
use crate::pipeline::Pipeline;
use crate::slugify::validate_pipeline_id;
use crate::utils::io::read_file;
use crate::utils::validation::{is_contained_relative, is_plain_file_name};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default, rename = "pipeline")]
    pub pipelines: Vec<PipelineConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_file")]
    pub file: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file: default_cache_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub id: String,
    #[serde(default = "default_dir")]
    pub dir: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_binary: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_program() -> String {
    defaults::TOOLCHAIN_PROGRAM.to_string()
}

fn default_cache_file() -> String {
    defaults::CACHE_FILE.to_string()
}

fn default_dir() -> String {
    ".".to_string()
}

fn default_true() -> bool {
    true
}

/// A parsed manifest plus the directory its relative paths hang off.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub path: PathBuf,
    pub manifest: Manifest,
    pub pipelines: Vec<Pipeline>,
}

impl LoadedManifest {
    pub fn pipeline_ids(&self) -> Vec<String> {
        self.pipelines.iter().map(|p| p.id.clone()).collect()
    }
}

/// Load and validate the manifest at `path`.
pub fn load(path: &Path) -> Result<LoadedManifest> {
    let raw = read_file(path, "read manifest")?;
    let manifest = parse(&raw, &path.to_string_lossy())?;
    let base = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let pipelines = resolve_pipelines(&manifest, &base)?;

    Ok(LoadedManifest {
        path: path.to_path_buf(),
        manifest,
        pipelines,
    })
}

/// Load the manifest named by `--manifest`, or the nearest one.
pub fn discover(explicit: Option<&str>) -> Result<LoadedManifest> {
    let path = paths::resolve_manifest(explicit)?;
    load(&path)
}

pub fn parse(raw: &str, origin: &str) -> Result<Manifest> {
    toml::from_str(raw).map_err(|e| Error::config_invalid_toml(origin, e))
}

/// Validate the manifest and turn each table into a [`Pipeline`] rooted
/// under `base`.
pub fn resolve_pipelines(manifest: &Manifest, base: &Path) -> Result<Vec<Pipeline>> {
    if manifest.pipelines.is_empty() {
        return Err(Error::config_invalid_value(
            "pipeline",
            None,
            "manifest declares no [[pipeline]] tables",
        ));
    }

    if manifest.toolchain.program.trim().is_empty() {
        return Err(Error::config_invalid_value(
            "toolchain.program",
            None,
            "toolchain program cannot be empty",
        ));
    }

    if !is_plain_file_name(&manifest.cache.file) {
        return Err(Error::config_invalid_value(
            "cache.file",
            Some(manifest.cache.file.clone()),
            "cache file must be a plain file name",
        ));
    }

    let mut seen = HashSet::new();
    let mut pipelines = Vec::with_capacity(manifest.pipelines.len());

    for config in &manifest.pipelines {
        validate_pipeline_id(&config.id)?;
        if !seen.insert(config.id.clone()) {
            return Err(Error::config_invalid_value(
                "pipeline.id",
                Some(config.id.clone()),
                format!("duplicate pipeline id '{}'", config.id),
            ));
        }
        pipelines.push(resolve_one(manifest, config, base)?);
    }

    check_output_dirs_disjoint(&pipelines)?;

    Ok(pipelines)
}

fn resolve_one(manifest: &Manifest, config: &PipelineConfig, base: &Path) -> Result<Pipeline> {
    let key = |field: &str| format!("pipeline.{}.{}", config.id, field);

    let dir = paths::expand(&config.dir);
    let root = normalize(&if dir.is_absolute() { dir } else { base.join(dir) });

    let source = PathBuf::from(&config.source);
    if config.source.trim().is_empty() || source.is_absolute() {
        return Err(Error::config_invalid_value(
            key("source"),
            Some(config.source.clone()),
            "source must be a relative path to a file",
        ));
    }

    let output_dir = PathBuf::from(
        config
            .output_dir
            .clone()
            .unwrap_or_else(|| defaults::OUTPUT_DIR.to_string()),
    );
    if !is_contained_relative(&output_dir) {
        return Err(Error::config_invalid_value(
            key("output_dir"),
            Some(output_dir.to_string_lossy().to_string()),
            "output_dir must be a relative path inside the pipeline directory",
        ));
    }

    let binary = match &config.binary {
        Some(name) => name.clone(),
        None => source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default(),
    };
    if !is_plain_file_name(&binary) {
        return Err(Error::config_invalid_value(
            key("binary"),
            Some(binary),
            "binary must be a plain file name",
        ));
    }

    let test_binary = config
        .test_binary
        .clone()
        .unwrap_or_else(|| format!("{}{}", defaults::TEST_BINARY_PREFIX, binary));
    if !is_plain_file_name(&test_binary) {
        return Err(Error::config_invalid_value(
            key("test_binary"),
            Some(test_binary),
            "test_binary must be a plain file name",
        ));
    }
    if test_binary == binary {
        return Err(Error::config_invalid_value(
            key("test_binary"),
            Some(test_binary),
            "test_binary must differ from binary",
        ));
    }

    let mut args = manifest.toolchain.args.clone();
    args.extend(config.args.iter().cloned());

    Ok(Pipeline {
        id: config.id.clone(),
        root,
        source,
        output_dir,
        binary,
        test_binary,
        args,
    })
}

/// No output directory may equal or contain another pipeline's output
/// directory or root: `clean` removes it recursively.
fn check_output_dirs_disjoint(pipelines: &[Pipeline]) -> Result<()> {
    for a in pipelines {
        let a_out = a.output_dir_path();
        for b in pipelines {
            if a.id == b.id {
                continue;
            }
            let b_out = b.output_dir_path();
            if b_out.starts_with(&a_out) || b.root.starts_with(&a_out) {
                return Err(Error::config_invalid_value(
                    format!("pipeline.{}.output_dir", b.id),
                    Some(b_out.to_string_lossy().to_string()),
                    format!(
                        "pipelines '{}' and '{}' overlap: cleaning '{}' would remove files of '{}'",
                        a.id, b.id, a.id, b.id
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Lexically fold `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}
