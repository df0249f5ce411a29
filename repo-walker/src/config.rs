//! Configuration types for repository walking.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Files larger than this are skipped rather than chunked (1 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Configuration for one repository walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkConfig {
    /// Path to the repository root.
    pub root: PathBuf,

    /// Patterns to exclude, matched against the root-relative path with a
    /// leading `/` (so `**/target/**` also matches a top-level `target`).
    pub exclude_patterns: Vec<String>,

    /// Files above this size are reported as oversized and never read.
    pub max_file_bytes: Option<u64>,

    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
}

impl WalkConfig {
    /// Create a walk config with the default excludes and size guard.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exclude_patterns: default_excludes(),
            max_file_bytes: Some(DEFAULT_MAX_FILE_BYTES),
            follow_symlinks: false,
        }
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Replace all exclude patterns.
    pub fn with_excludes(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Set the size guard. `None` disables it.
    pub fn with_max_file_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_file_bytes = limit;
        self
    }

    /// Enable or disable following symbolic links.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}

/// Default exclude patterns.
pub fn default_excludes() -> Vec<String> {
    let dirs = [
        // Version control
        ".git",
        // Dependencies
        "node_modules",
        "venv",
        ".venv",
        // Build artifacts
        ".next",
        "dist",
        "build",
        "target",
        "bin",
        "obj",
        "__pycache__",
        // IDE/Editor
        ".vscode",
        ".idea",
    ];
    let files = [
        // Lock files and local settings
        "package-lock.json",
        "yarn.lock",
        "pnpm-lock.yaml",
        ".gitignore",
        ".env",
        ".env.*",
    ];
    let extensions = [
        // Media, archives and binaries
        "png", "jpg", "jpeg", "svg", "ico", "mp4", "zip", "tar", "gz", "pdf", "exe", "dll", "iso",
    ];

    dirs.iter()
        .map(|d| format!("**/{d}/**"))
        .chain(files.iter().map(|f| format!("**/{f}")))
        .chain(extensions.iter().map(|e| format!("**/*.{e}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn test_walk_config_creation() {
        let config = WalkConfig::new("/home/user/repo")
            .exclude("**/*.snap")
            .with_max_file_bytes(None);

        assert_eq!(config.root, Path::new("/home/user/repo"));
        assert_eq!(config.max_file_bytes, None);
        assert_eq!(config.exclude_patterns.last().unwrap(), "**/*.snap");
    }

    #[test]
    fn test_default_excludes() {
        let excludes = default_excludes();
        assert!(excludes.contains(&"**/node_modules/**".to_string()));
        assert!(excludes.contains(&"**/.env.*".to_string()));
        assert!(excludes.contains(&"**/*.png".to_string()));
    }
}
