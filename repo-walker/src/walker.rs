//! Repository traversal.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use wildmatch::WildMatch;

use crate::config::WalkConfig;
use crate::error::{Result, WalkerError};

/// A file selected for ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkedFile {
    /// Full path to the file.
    pub path: PathBuf,

    /// Size in bytes at walk time.
    pub size: u64,
}

/// Result of walking a repository.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkOutcome {
    /// Files to ingest, sorted by path.
    pub files: Vec<WalkedFile>,

    /// Files skipped by the size guard, sorted by path.
    pub oversized: Vec<PathBuf>,
}

/// Walks a repository according to a [`WalkConfig`].
pub struct RepoWalker {
    config: WalkConfig,
    excludes: Vec<WildMatch>,
}

impl RepoWalker {
    /// Create a walker, compiling its exclude patterns.
    pub fn new(config: WalkConfig) -> Self {
        let excludes = config
            .exclude_patterns
            .iter()
            .map(|p| WildMatch::new(p))
            .collect();
        Self { config, excludes }
    }

    /// The configuration this walker uses.
    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    /// Check if a root-relative path should be excluded.
    pub fn should_exclude(&self, relative: &Path, is_dir: bool) -> bool {
        let mut key = String::from("/");
        for component in relative.components() {
            if let Component::Normal(part) = component {
                if key.len() > 1 {
                    key.push('/');
                }
                key.push_str(&part.to_string_lossy());
            }
        }
        if is_dir {
            key.push('/');
        }

        self.excludes.iter().any(|pattern| pattern.matches(&key))
    }

    /// Walk the repository.
    pub fn walk(&self) -> Result<WalkOutcome> {
        let root = &self.config.root;
        if !root.exists() {
            return Err(WalkerError::RootNotFound(root.display().to_string()));
        }
        if !root.is_dir() {
            return Err(WalkerError::NotADirectory(root.display().to_string()));
        }

        info!("Scanning directory: {}", root.display());

        let walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        let mut outcome = WalkOutcome::default();
        let entries = walker.into_iter().filter_entry(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            relative.as_os_str().is_empty()
                || !self.should_exclude(relative, entry.file_type().is_dir())
        });

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    warn!("Skipping {}: {e}", entry.path().display());
                    continue;
                }
            };

            let path = entry.into_path();
            match self.config.max_file_bytes {
                Some(limit) if size > limit => {
                    warn!(
                        "Skipping large file: {} ({:.2} MB)",
                        path.display(),
                        size as f64 / 1024.0 / 1024.0
                    );
                    outcome.oversized.push(path);
                }
                _ => {
                    debug!("Found file: {}", path.display());
                    outcome.files.push(WalkedFile { path, size });
                }
            }
        }

        outcome.files.sort_by(|a, b| a.path.cmp(&b.path));
        outcome.oversized.sort();

        info!(
            "Found {} files in {} ({} oversized)",
            outcome.files.len(),
            root.display(),
            outcome.oversized.len()
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_FILE_BYTES;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn relative_files(root: &Path, outcome: &WalkOutcome) -> Vec<String> {
        outcome
            .files
            .iter()
            .map(|f| {
                f.path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_exclude_patterns() {
        let walker = RepoWalker::new(WalkConfig::new("/repo"));

        assert!(walker.should_exclude(Path::new(".git"), true));
        assert!(walker.should_exclude(Path::new("node_modules/pkg/index.js"), false));
        assert!(walker.should_exclude(Path::new("web/node_modules"), true));
        assert!(walker.should_exclude(Path::new(".env"), false));
        assert!(walker.should_exclude(Path::new("config/.env.local"), false));
        assert!(walker.should_exclude(Path::new("assets/logo.png"), false));
        assert!(walker.should_exclude(Path::new("package-lock.json"), false));
        assert!(!walker.should_exclude(Path::new("src/main.rs"), false));
        assert!(!walker.should_exclude(Path::new("src"), true));
        assert!(!walker.should_exclude(Path::new("docs/environment.md"), false));
    }

    #[test]
    fn test_walk_skips_excluded_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "src/main.rs", b"fn main() {}");
        write(root, "src/lib.rs", b"pub mod a;");
        write(root, "README.md", b"# demo");
        write(root, "node_modules/x/index.js", b"module.exports = 1");
        write(root, "target/debug/build.log", b"log");
        write(root, "logo.png", b"\x89PNG");
        write(root, ".env", b"SECRET=1");

        let outcome = RepoWalker::new(WalkConfig::new(root)).walk().unwrap();

        assert_eq!(
            relative_files(root, &outcome),
            vec!["README.md", "src/lib.rs", "src/main.rs"]
        );
        assert!(outcome.oversized.is_empty());
    }

    #[test]
    fn test_size_guard() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "small.txt", b"tiny");
        write(root, "huge.txt", &vec![b'a'; DEFAULT_MAX_FILE_BYTES as usize + 1]);

        let outcome = RepoWalker::new(WalkConfig::new(root)).walk().unwrap();

        assert_eq!(relative_files(root, &outcome), vec!["small.txt"]);
        assert_eq!(outcome.oversized, vec![root.join("huge.txt")]);
    }

    #[test]
    fn test_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        let err = RepoWalker::new(WalkConfig::new(missing)).walk().unwrap_err();
        assert!(matches!(err, WalkerError::RootNotFound(_)));
    }

    #[test]
    fn test_root_must_be_directory() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "file.txt", b"x");

        let err = RepoWalker::new(WalkConfig::new(temp_dir.path().join("file.txt")))
            .walk()
            .unwrap_err();
        assert!(matches!(err, WalkerError::NotADirectory(_)));
    }
}
