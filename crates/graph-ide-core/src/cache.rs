//! Per-stage result cache under `.graph-ide/`
//!
//! Every pipeline stage persists one artifact. A stage is reusable only while
//! the project is unchanged (cheap mtime fingerprint plus per-file content
//! digests) and every prerequisite stage is itself reusable.
//!
//! The directory assumes a single writer: two concurrent runs on the same
//! project may interleave manifest rewrites.

use crate::error::CacheError;
use crate::steps::{dependents, step_dependencies_table, PipelineStep};
use crate::walker::{FileWalker, WalkedFile};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Cache directory: .graph-ide/
pub const CACHE_DIR: &str = ".graph-ide";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const ANALYSIS_FILE: &str = "semantic-analysis.json";
pub const STEP_MANIFEST_FILE: &str = "step-manifest.json";
pub const CACHE_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    pub path: String,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheManifest {
    pub version: String,
    pub last_updated: String,
    pub project_hash: String,
    pub file_count: usize,
    pub files: Vec<FileDigest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepManifest {
    #[serde(flatten)]
    pub manifest: CacheManifest,
    pub completed_steps: Vec<PipelineStep>,
    pub step_dependencies: BTreeMap<String, Option<Vec<u8>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepCacheEntry<T> {
    pub step: PipelineStep,
    pub timestamp: String,
    pub completed: bool,
    pub project_hash: String,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisEntry<T> {
    pub version: String,
    pub timestamp: String,
    pub project_hash: String,
    pub data: T,
}

/// The project as it is on disk right now.
struct ProjectSnapshot {
    fingerprint: String,
    files: Vec<WalkedFile>,
}

impl ProjectSnapshot {
    fn digests(&self) -> Vec<FileDigest> {
        self.files
            .iter()
            .filter_map(|f| {
                hash_file(&f.absolute).map(|hash| FileDigest {
                    path: f.relative.clone(),
                    hash,
                })
            })
            .collect()
    }

    /// Fingerprint plus deep check against a recorded manifest.
    fn matches(&self, manifest: &CacheManifest) -> bool {
        if manifest.project_hash != self.fingerprint {
            tracing::debug!("Project fingerprint changed");
            return false;
        }
        if manifest.file_count != self.files.len() {
            tracing::debug!(
                "File count changed: {} -> {}",
                manifest.file_count,
                self.files.len()
            );
            return false;
        }
        let tracked: HashMap<&str, &str> = manifest
            .files
            .iter()
            .map(|f| (f.path.as_str(), f.hash.as_str()))
            .collect();
        for file in &self.files {
            let Some(recorded) = tracked.get(file.relative.as_str()) else {
                tracing::debug!("Untracked file: {}", file.relative);
                return false;
            };
            if hash_file(&file.absolute).as_deref() != Some(*recorded) {
                tracing::debug!("Content changed: {}", file.relative);
                return false;
            }
        }
        true
    }
}

/// Owns the `.graph-ide/` directory of one project.
#[derive(Debug, Clone)]
pub struct CacheManager {
    root: PathBuf,
    walker: FileWalker,
}

impl CacheManager {
    pub fn new(root: impl AsRef<Path>, walker: FileWalker) -> Self {
        CacheManager {
            root: root.as_ref().to_path_buf(),
            walker,
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(CACHE_DIR)
    }

    pub fn step_path(&self, step: PipelineStep) -> PathBuf {
        self.cache_dir()
            .join(format!("step-{}-cache.json", step.number()))
    }

    fn step_manifest_path(&self) -> PathBuf {
        self.cache_dir().join(STEP_MANIFEST_FILE)
    }

    fn ensure_cache_dir(&self) -> Result<(), CacheError> {
        let dir = self.cache_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
        }
        Ok(())
    }

    fn snapshot(&self) -> ProjectSnapshot {
        let files = self.walker.walk();
        let fingerprint = fingerprint_files(&files);
        ProjectSnapshot { fingerprint, files }
    }

    /// SHA-256 over the sorted `(relative path, mtime)` list of every matched file.
    pub fn compute_project_fingerprint(&self) -> String {
        fingerprint_files(&self.walker.walk())
    }

    pub fn load_step_manifest(&self) -> Option<StepManifest> {
        read_json(&self.step_manifest_path())
    }

    /// Whether `step` can be loaded instead of recomputed.
    pub fn is_step_cache_valid(&self, step: PipelineStep) -> bool {
        let mut check = ValidityCheck::new(self);
        check.is_valid(step)
    }

    /// Validity of every step, computed against a single snapshot.
    pub fn step_status(&self) -> Vec<(PipelineStep, bool)> {
        let mut check = ValidityCheck::new(self);
        PipelineStep::ALL
            .into_iter()
            .map(|step| (step, check.is_valid(step)))
            .collect()
    }

    /// Load a step artifact. Unreadable or unparseable artifacts are a miss.
    pub fn load_step_cache<T: DeserializeOwned>(&self, step: PipelineStep) -> Option<StepCacheEntry<T>> {
        let entry: StepCacheEntry<T> = read_json(&self.step_path(step))?;
        if entry.step != step || !entry.completed {
            tracing::warn!("Ignoring mismatched cache artifact for {}", step);
            return None;
        }
        Some(entry)
    }

    /// Persist a step artifact, then record the step in the step manifest.
    pub fn save_step_cache<T: Serialize>(&self, step: PipelineStep, data: &T) -> Result<(), CacheError> {
        self.ensure_cache_dir()?;
        let snapshot = self.snapshot();
        let now = chrono::Utc::now().to_rfc3339();

        let entry = StepCacheEntry {
            step,
            timestamp: now.clone(),
            completed: true,
            project_hash: snapshot.fingerprint.clone(),
            data,
        };
        write_json(&self.step_path(step), &entry)?;

        let mut completed_steps = match self.load_step_manifest() {
            Some(existing) if existing.manifest.project_hash == snapshot.fingerprint => {
                existing.completed_steps
            }
            _ => Vec::new(),
        };
        if !completed_steps.contains(&step) {
            completed_steps.push(step);
        }
        completed_steps.sort();

        let files = snapshot.digests();
        let manifest = StepManifest {
            manifest: CacheManifest {
                version: CACHE_VERSION.to_string(),
                last_updated: now,
                project_hash: snapshot.fingerprint,
                file_count: files.len(),
                files,
            },
            completed_steps,
            step_dependencies: step_dependencies_table(),
        };
        write_json(&self.step_manifest_path(), &manifest)?;

        tracing::debug!("Saved cache for {}", step);
        Ok(())
    }

    /// Delete the manifests and every step artifact.
    pub fn invalidate_all(&self) -> Result<(), CacheError> {
        let mut paths = vec![
            self.step_manifest_path(),
            self.cache_dir().join(MANIFEST_FILE),
            self.cache_dir().join(ANALYSIS_FILE),
        ];
        paths.extend(PipelineStep::ALL.into_iter().map(|s| self.step_path(s)));

        for path in paths {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::io(&path, e)),
            }
        }
        tracing::info!("Cache invalidated: {}", self.cache_dir().display());
        Ok(())
    }

    /// Drop one step and everything downstream of it. Returns the removed steps.
    pub fn invalidate_step(&self, step: PipelineStep) -> Result<Vec<PipelineStep>, CacheError> {
        let mut removed = vec![step];
        removed.extend(dependents(step));

        for s in &removed {
            let path = self.step_path(*s);
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(CacheError::io(&path, e));
                }
            }
        }
        if let Some(mut manifest) = self.load_step_manifest() {
            manifest.completed_steps.retain(|s| !removed.contains(s));
            write_json(&self.step_manifest_path(), &manifest)?;
        }
        Ok(removed)
    }

    /// Wipe the cache when a manifest exists but the project no longer
    /// matches it. Returns whether anything was invalidated.
    pub fn ensure_fresh(&self) -> Result<bool, CacheError> {
        let Some(manifest) = self.load_step_manifest() else {
            return Ok(false);
        };
        if self.snapshot().matches(&manifest.manifest) {
            return Ok(false);
        }
        tracing::info!("Project changed since last analysis; discarding cached stages");
        self.invalidate_all()?;
        Ok(true)
    }

    /// Persist the assembled analysis and the project manifest.
    pub fn save_analysis<T: Serialize>(&self, data: &T) -> Result<(), CacheError> {
        self.ensure_cache_dir()?;
        let snapshot = self.snapshot();
        let now = chrono::Utc::now().to_rfc3339();
        let files = snapshot.digests();

        let manifest = CacheManifest {
            version: CACHE_VERSION.to_string(),
            last_updated: now.clone(),
            project_hash: snapshot.fingerprint.clone(),
            file_count: files.len(),
            files,
        };
        write_json(&self.cache_dir().join(MANIFEST_FILE), &manifest)?;

        let entry = AnalysisEntry {
            version: CACHE_VERSION.to_string(),
            timestamp: now,
            project_hash: snapshot.fingerprint,
            data,
        };
        write_json(&self.cache_dir().join(ANALYSIS_FILE), &entry)
    }

    pub fn load_analysis<T: DeserializeOwned>(&self) -> Option<AnalysisEntry<T>> {
        read_json(&self.cache_dir().join(ANALYSIS_FILE))
    }
}

/// Memoised validity evaluation over one snapshot.
struct ValidityCheck<'a> {
    manager: &'a CacheManager,
    manifest: Option<StepManifest>,
    project_ok: bool,
    memo: HashMap<PipelineStep, bool>,
}

impl<'a> ValidityCheck<'a> {
    fn new(manager: &'a CacheManager) -> Self {
        let manifest = manager.load_step_manifest();
        let project_ok = manifest
            .as_ref()
            .is_some_and(|m| manager.snapshot().matches(&m.manifest));
        ValidityCheck {
            manager,
            manifest,
            project_ok,
            memo: HashMap::new(),
        }
    }

    fn is_valid(&mut self, step: PipelineStep) -> bool {
        if let Some(&known) = self.memo.get(&step) {
            return known;
        }
        let valid = self.check(step);
        self.memo.insert(step, valid);
        valid
    }

    fn check(&mut self, step: PipelineStep) -> bool {
        if !self.project_ok {
            return false;
        }
        let Some(manifest) = &self.manifest else {
            return false;
        };
        if !manifest.completed_steps.contains(&step) {
            return false;
        }
        let project_hash = manifest.manifest.project_hash.clone();
        match self.manager.load_step_cache::<serde_json::Value>(step) {
            Some(entry) if entry.project_hash == project_hash => {}
            _ => return false,
        }
        step.prerequisites().iter().all(|&p| self.is_valid(p))
    }
}

fn fingerprint_files(files: &[WalkedFile]) -> String {
    let mut entries: Vec<(&str, u128)> = files
        .iter()
        .map(|f| (f.relative.as_str(), modified_millis(&f.absolute)))
        .collect();
    entries.sort();

    let mut hasher = Sha256::new();
    for (path, mtime) in entries {
        hasher.update(path.as_bytes());
        hasher.update(b":");
        hasher.update(mtime.to_string().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

fn modified_millis(path: &Path) -> u128 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// SHA-256 of a file's content, or `None` when it cannot be read.
pub fn hash_file(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => Some(hash_bytes(&bytes)),
        Err(e) => {
            tracing::warn!("Cannot hash {}: {}", path.display(), e);
            None
        }
    }
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Corrupt cache file {}: {}", path.display(), e);
            None
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CacheError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|e| CacheError::io(path, e))
}
