//! Python source discovery across the configured directories
//!
//! Architecture: Service Layer - FileCollector orchestrates path discovery
//! - Scans each configured directory exactly one level deep
//! - Keeps only regular files with a .py extension
//! - Applies exclusion globs against the file name or the relative path
//! - Returns a sorted, de-duplicated list so runs are deterministic

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::ScrubConfig;
use crate::domain::violations::{ScrubError, ScrubResult};

/// Discovers the Python files a run operates on
#[derive(Debug, Clone)]
pub struct FileCollector {
    /// Root the configured directories are resolved against
    root: PathBuf,
    /// Directories to scan, relative to the root
    directories: Vec<PathBuf>,
    /// Compiled exclusion patterns
    excludes: Vec<ExcludePattern>,
}

/// A single exclusion pattern
#[derive(Debug, Clone)]
struct ExcludePattern {
    pattern: glob::Pattern,
    /// Original pattern string, kept to decide filename vs path matching
    original: String,
}

impl FileCollector {
    /// Build a collector from configuration, compiling the exclusion globs
    pub fn new<P: AsRef<Path>>(root: P, config: &ScrubConfig) -> ScrubResult<Self> {
        let mut excludes = Vec::new();
        for pattern_str in &config.paths.exclude {
            let pattern = glob::Pattern::new(pattern_str).map_err(|e| {
                ScrubError::pattern(format!("Invalid exclude pattern '{pattern_str}': {e}"))
            })?;
            excludes.push(ExcludePattern {
                pattern,
                original: pattern_str.clone(),
            });
        }

        Ok(Self {
            root: root.as_ref().to_path_buf(),
            directories: config.paths.directories.iter().map(PathBuf::from).collect(),
            excludes,
        })
    }

    /// Collect every matching file across the configured directories
    ///
    /// A directory that does not exist is logged and skipped, so a fresh
    /// repository without a tests/ tree still gets its app/ files scrubbed.
    pub fn collect(&self) -> ScrubResult<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = Vec::new();

        for dir in &self.directories {
            let dir_path = self.root.join(dir);
            if !dir_path.is_dir() {
                tracing::warn!("Skipping missing directory: {}", dir_path.display());
                continue;
            }

            // max_depth(1) keeps the scan at immediate children only
            for entry in WalkDir::new(&dir_path)
                .min_depth(1)
                .max_depth(1)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if !entry.file_type().is_file() {
                    continue;
                }
                if path.extension().map_or(true, |ext| ext != "py") {
                    continue;
                }
                if self.is_excluded(path) {
                    continue;
                }
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Check a path against the exclusion patterns
    ///
    /// Patterns without a slash match the file name alone, patterns with a
    /// slash match the path relative to the root.
    fn is_excluded(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);

        for exclude in &self.excludes {
            let matches = if exclude.original.contains('/') {
                exclude.pattern.matches(&relative.to_string_lossy())
            } else {
                path.file_name()
                    .map_or(false, |name| exclude.pattern.matches(&name.to_string_lossy()))
            };
            if matches {
                return true;
            }
        }

        false
    }
}
