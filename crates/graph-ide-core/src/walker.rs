//! Recursive, extension-filtered file enumeration

use crate::config::GraphIdeConfig;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A matched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    pub absolute: PathBuf,
    /// Project-relative path with `/` separators.
    pub relative: String,
}

/// Enumerates project source files. Shared by hashing and extraction so both
/// see exactly the same file set.
#[derive(Debug, Clone)]
pub struct FileWalker {
    root: PathBuf,
    extensions: HashSet<String>,
    exclude_dirs: Arc<HashSet<String>>,
    exclude_globs: Option<GlobSet>,
    respect_gitignore: bool,
}

impl FileWalker {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::from_parts(root, &GraphIdeConfig::default(), None)
    }

    pub fn from_config(root: impl AsRef<Path>, config: &GraphIdeConfig) -> anyhow::Result<Self> {
        let globs = if config.exclude_globs.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in &config.exclude_globs {
                builder.add(Glob::new(pattern)?);
            }
            Some(builder.build()?)
        };
        Ok(Self::from_parts(root, config, globs))
    }

    fn from_parts(root: impl AsRef<Path>, config: &GraphIdeConfig, exclude_globs: Option<GlobSet>) -> Self {
        FileWalker {
            root: root.as_ref().to_path_buf(),
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            exclude_dirs: Arc::new(config.exclude_dirs.iter().cloned().collect()),
            exclude_globs,
            respect_gitignore: config.respect_gitignore,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree. Unreadable entries are logged and skipped; the result is
    /// sorted by relative path.
    pub fn walk(&self) -> Vec<WalkedFile> {
        let exclude_dirs = Arc::clone(&self.exclude_dirs);
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .ignore(self.respect_gitignore)
            .require_git(false)
            .follow_links(false)
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                !(is_dir && exclude_dirs.contains(entry.file_name().to_string_lossy().as_ref()))
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Cannot read entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            if !self.has_matching_extension(path) {
                continue;
            }
            let Some(relative) = relative_path(&self.root, path) else {
                continue;
            };
            if let Some(globs) = &self.exclude_globs {
                if globs.is_match(&relative) {
                    tracing::debug!("Excluded by glob: {}", relative);
                    continue;
                }
            }
            files.push(WalkedFile {
                absolute: path.to_path_buf(),
                relative,
            });
        }

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        files
    }

    fn has_matching_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(&e.to_ascii_lowercase()))
    }
}

/// Project-relative, `/`-separated form of `path`.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_repo_with_structure;

    #[test]
    fn filters_extensions_and_excluded_dirs() {
        let dir = create_repo_with_structure(&[
            ("src/a.ts", "export const a = 1;"),
            ("src/view/b.tsx", "export const B = () => null;"),
            ("src/readme.md", "# docs"),
            ("node_modules/pkg/index.js", "module.exports = {};"),
            ("dist/a.js", "var a = 1;"),
            (".graph-ide/step-1-cache.json", "{}"),
        ]);

        let files: Vec<String> = FileWalker::new(dir.path())
            .walk()
            .into_iter()
            .map(|f| f.relative)
            .collect();

        assert_eq!(files, vec!["src/a.ts", "src/view/b.tsx"]);
    }

    #[test]
    fn exclude_globs_apply_to_relative_paths() {
        let dir = create_repo_with_structure(&[
            ("src/a.ts", ""),
            ("src/generated/api.ts", ""),
        ]);
        let config = GraphIdeConfig {
            exclude_globs: vec!["src/generated/**".to_string()],
            ..GraphIdeConfig::default()
        };

        let files: Vec<String> = FileWalker::from_config(dir.path(), &config)
            .unwrap()
            .walk()
            .into_iter()
            .map(|f| f.relative)
            .collect();

        assert_eq!(files, vec!["src/a.ts"]);
    }
}
