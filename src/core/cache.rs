//! Memoized build records.
//!
//! Each successful compilation leaves a [`CacheEntry`] keyed by its rendered
//! command line. A later identical invocation is skipped when the toolchain
//! identity and the digests of every input and output still match what is on
//! disk. `clean` uses the same records to find the files it must delete.

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::utils::io::{read_file, remove_file_if_exists, write_file_atomic};

const DEPS_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub toolchain: String,
    /// Relative path -> SHA-256 hex digest.
    pub inputs: BTreeMap<String, String>,
    pub outputs: BTreeMap<String, String>,
    pub recorded_at: String,
}

impl CacheEntry {
    pub fn new(
        toolchain: String,
        inputs: BTreeMap<String, String>,
        outputs: BTreeMap<String, String>,
    ) -> Self {
        Self {
            toolchain,
            inputs,
            outputs,
            recorded_at: Utc::now().to_rfc3339(),
        }
    }
}

pub trait BuildCache {
    fn lookup(&self, key: &str) -> Option<&CacheEntry>;

    fn record(&mut self, key: String, entry: CacheEntry) -> Result<()>;

    /// Every output path any record mentions, relative to the pipeline root.
    fn tracked_outputs(&self) -> Vec<String>;

    /// Forget everything, including any persisted state.
    fn clear(&mut self) -> Result<()>;

    /// A disabled cache never short-circuits a compilation, so callers can
    /// skip computing the toolchain identity.
    fn is_enabled(&self) -> bool {
        true
    }
}

fn tracked(entries: &BTreeMap<String, CacheEntry>) -> Vec<String> {
    let mut outputs: Vec<String> = entries
        .values()
        .flat_map(|e| e.outputs.keys().cloned())
        .collect();
    outputs.sort();
    outputs.dedup();
    outputs
}

// ============================================================================
// Persisted cache
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct DepsDocument {
    version: u32,
    /// Pipeline id -> cache key -> record. Pipelines sharing a root share
    /// the file but never see each other's records.
    #[serde(default)]
    pipelines: BTreeMap<String, BTreeMap<String, CacheEntry>>,
}

impl Default for DepsDocument {
    fn default() -> Self {
        Self {
            version: DEPS_VERSION,
            pipelines: BTreeMap::new(),
        }
    }
}

/// JSON deps file in the pipeline root, rewritten atomically on each change.
///
/// A `DepsFile` is scoped to one pipeline: lookups, tracked outputs and
/// `clear` only touch that pipeline's records.
#[derive(Debug)]
pub struct DepsFile {
    path: PathBuf,
    pipeline_id: String,
    doc: DepsDocument,
}

impl DepsFile {
    /// Open `path` for `pipeline_id`, starting empty when the file does not
    /// exist yet.
    pub fn open(path: impl Into<PathBuf>, pipeline_id: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let pipeline_id = pipeline_id.into();
        if !path.exists() {
            return Ok(Self {
                path,
                pipeline_id,
                doc: DepsDocument::default(),
            });
        }

        let raw = read_file(&path, "read build cache")?;
        let doc: DepsDocument = serde_json::from_str(&raw)
            .map_err(|e| Error::cache_corrupt(path.to_string_lossy(), e))?;

        if doc.version != DEPS_VERSION {
            return Err(Error::cache_corrupt(
                path.to_string_lossy(),
                format!("unsupported version {}", doc.version),
            ));
        }

        Ok(Self {
            path,
            pipeline_id,
            doc,
        })
    }

    fn entries(&self) -> Option<&BTreeMap<String, CacheEntry>> {
        self.doc.pipelines.get(&self.pipeline_id)
    }

    fn save(&self) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.doc)
            .map_err(|e| Error::internal_json(e.to_string(), Some("serialize build cache".into())))?;
        write_file_atomic(&self.path, &raw, "write build cache")
    }
}

impl BuildCache for DepsFile {
    fn lookup(&self, key: &str) -> Option<&CacheEntry> {
        self.entries()?.get(key)
    }

    fn record(&mut self, key: String, entry: CacheEntry) -> Result<()> {
        self.doc
            .pipelines
            .entry(self.pipeline_id.clone())
            .or_default()
            .insert(key, entry);
        self.save()
    }

    fn tracked_outputs(&self) -> Vec<String> {
        self.entries().map(tracked).unwrap_or_default()
    }

    fn clear(&mut self) -> Result<()> {
        self.doc.pipelines.remove(&self.pipeline_id);
        if !self.doc.pipelines.is_empty() {
            return self.save();
        }
        remove_file_if_exists(&self.path)
            .map_err(|e| Error::clean_remove_failed(self.path.to_string_lossy(), e.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// In-memory and disabled caches
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BuildCache for MemoryCache {
    fn lookup(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    fn record(&mut self, key: String, entry: CacheEntry) -> Result<()> {
        self.entries.insert(key, entry);
        Ok(())
    }

    fn tracked_outputs(&self) -> Vec<String> {
        tracked(&self.entries)
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl BuildCache for NoCache {
    fn lookup(&self, _key: &str) -> Option<&CacheEntry> {
        None
    }

    fn record(&mut self, _key: String, _entry: CacheEntry) -> Result<()> {
        Ok(())
    }

    fn tracked_outputs(&self) -> Vec<String> {
        Vec::new()
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

// ============================================================================
// Freshness
// ============================================================================

/// SHA-256 of a file's contents as lowercase hex.
pub fn fingerprint_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Digest every path in `rel_paths` under `root`.
pub fn snapshot<P: AsRef<Path>>(root: &Path, rel_paths: &[P]) -> io::Result<BTreeMap<String, String>> {
    let mut digests = BTreeMap::new();
    for rel in rel_paths {
        let rel = rel.as_ref();
        digests.insert(
            rel.to_string_lossy().to_string(),
            fingerprint_file(&root.join(rel))?,
        );
    }
    Ok(digests)
}

/// Whether `entry` still describes the files under `root`.
///
/// Any unreadable or missing file makes the entry stale.
pub fn is_fresh(entry: &CacheEntry, toolchain: &str, root: &Path) -> bool {
    if entry.toolchain != toolchain {
        return false;
    }

    entry
        .inputs
        .iter()
        .chain(entry.outputs.iter())
        .all(|(rel, digest)| {
            fingerprint_file(&root.join(rel))
                .map(|current| &current == digest)
                .unwrap_or(false)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn entry_for(root: &Path, toolchain: &str) -> CacheEntry {
        CacheEntry::new(
            toolchain.to_string(),
            snapshot(root, &["chop1.rs"]).unwrap(),
            snapshot(root, &["bin/chop1"]).unwrap(),
        )
    }

    fn scratch() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("chop1.rs"), "fn main() {}").unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("bin/chop1"), "ELF").unwrap();
        dir
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, "").unwrap();
        assert_eq!(
            fingerprint_file(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn fresh_until_source_changes() {
        let dir = scratch();
        let entry = entry_for(dir.path(), "rustc 1.80.0");
        assert!(is_fresh(&entry, "rustc 1.80.0", dir.path()));

        fs::write(dir.path().join("chop1.rs"), "fn main() { println!(); }").unwrap();
        assert!(!is_fresh(&entry, "rustc 1.80.0", dir.path()));
    }

    #[test]
    fn stale_when_output_removed_or_toolchain_changes() {
        let dir = scratch();
        let entry = entry_for(dir.path(), "rustc 1.80.0");
        assert!(!is_fresh(&entry, "rustc 1.81.0", dir.path()));

        fs::remove_file(dir.path().join("bin/chop1")).unwrap();
        assert!(!is_fresh(&entry, "rustc 1.80.0", dir.path()));
    }

    #[test]
    fn deps_file_round_trips_through_disk() {
        let dir = scratch();
        let path = dir.path().join(".kata-deps.json");

        let mut cache = DepsFile::open(&path, "chop").unwrap();
        assert!(cache.lookup("rustc chop1.rs -o bin/chop1").is_none());
        cache
            .record(
                "rustc chop1.rs -o bin/chop1".to_string(),
                entry_for(dir.path(), "rustc 1.80.0"),
            )
            .unwrap();

        let reopened = DepsFile::open(&path, "chop").unwrap();
        let entry = reopened.lookup("rustc chop1.rs -o bin/chop1").unwrap();
        assert_eq!(entry.toolchain, "rustc 1.80.0");
        assert_eq!(reopened.tracked_outputs(), vec!["bin/chop1".to_string()]);
    }

    #[test]
    fn deps_file_clear_removes_file_and_tolerates_absence() {
        let dir = scratch();
        let path = dir.path().join(".kata-deps.json");
        let mut cache = DepsFile::open(&path, "chop").unwrap();
        cache
            .record("k".to_string(), entry_for(dir.path(), "rustc"))
            .unwrap();
        assert!(path.exists());

        cache.clear().unwrap();
        assert!(!path.exists());
        assert!(cache.tracked_outputs().is_empty());
        cache.clear().unwrap();
    }

    #[test]
    fn pipelines_sharing_a_deps_file_stay_separate() {
        let dir = scratch();
        let path = dir.path().join(".kata-deps.json");

        let mut chop = DepsFile::open(&path, "chop").unwrap();
        chop.record("rustc chop1.rs".to_string(), entry_for(dir.path(), "rustc"))
            .unwrap();
        let mut kata2 = DepsFile::open(&path, "kata2").unwrap();
        assert!(kata2.lookup("rustc chop1.rs").is_none());
        assert!(kata2.tracked_outputs().is_empty());
        kata2
            .record("rustc chop.rs".to_string(), entry_for(dir.path(), "rustc"))
            .unwrap();

        let mut chop = DepsFile::open(&path, "chop").unwrap();
        chop.clear().unwrap();
        assert!(path.exists());

        let kata2 = DepsFile::open(&path, "kata2").unwrap();
        assert!(kata2.lookup("rustc chop.rs").is_some());
        assert!(DepsFile::open(&path, "chop")
            .unwrap()
            .lookup("rustc chop1.rs")
            .is_none());
    }

    #[test]
    fn corrupt_deps_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".kata-deps.json");
        fs::write(&path, "{ not json").unwrap();

        let err = DepsFile::open(&path, "chop").unwrap_err();
        assert_eq!(err.code.as_str(), "cache.corrupt");
        assert!(!err.hints.is_empty());
    }

    #[test]
    fn unknown_version_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".kata-deps.json");
        fs::write(&path, r#"{"version": 99, "pipelines": {}}"#).unwrap();

        let err = DepsFile::open(&path, "chop").unwrap_err();
        assert_eq!(err.code.as_str(), "cache.corrupt");
    }

    #[test]
    fn tracked_outputs_are_deduplicated() {
        let dir = scratch();
        let mut cache = MemoryCache::new();
        cache
            .record("a".to_string(), entry_for(dir.path(), "rustc"))
            .unwrap();
        cache
            .record("b".to_string(), entry_for(dir.path(), "rustc"))
            .unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.tracked_outputs(), vec!["bin/chop1".to_string()]);
    }

    #[test]
    fn no_cache_never_remembers() {
        let dir = scratch();
        let mut cache = NoCache;
        cache
            .record("a".to_string(), entry_for(dir.path(), "rustc"))
            .unwrap();
        assert!(cache.lookup("a").is_none());
        assert!(!cache.is_enabled());
    }
}
