//! Context storage and persistence.
//!
//! The `ContextStore` keeps one JSON array of fragments per named context in
//! a data directory. Context names are sanitized to `[A-Za-z0-9_-]` before
//! they touch the filesystem, identically for every operation, so a name can
//! never escape the data directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{ContextError, Result, StorageError};
use crate::fragment::{Collection, Fragment};

const EXTENSION: &str = "json";

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
///
/// Empty names are rejected.
pub fn sanitize_name(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(ContextError::Validation(
            "context name is required".to_string(),
        ));
    }

    Ok(name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect())
}

/// Summary of a stored context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    /// Sanitized context name.
    pub name: String,

    /// File name inside the data directory.
    pub file_name: String,

    /// Full path to the context file.
    pub path: PathBuf,

    /// File size in bytes.
    pub size_bytes: u64,

    /// Last modification time, when the platform reports one.
    pub modified: Option<DateTime<Utc>>,
}

/// File-backed store of named fragment collections.
#[derive(Debug, Clone)]
pub struct ContextStore {
    /// Root directory for context files.
    root: PathBuf,
}

impl ContextStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::CreateDirectory(format!("{}: {e}", root.display())))?;

        Ok(Self { root })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `name`.
    pub fn context_path(&self, name: &str) -> Result<PathBuf> {
        let safe = sanitize_name(name)?;
        Ok(self.root.join(format!("{safe}.{EXTENSION}")))
    }

    /// Whether a context named `name` exists.
    ///
    /// Failures other than absence (an unreadable data directory, say) are
    /// reported rather than read as "missing".
    pub async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.context_path(name)?;
        let exists = fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", path.display())))?;
        Ok(exists)
    }

    /// Persist `fragments` as context `name`, replacing any previous version.
    ///
    /// The file is written to a temporary sibling and renamed into place, so
    /// readers never observe a half-written context.
    pub async fn save(&self, name: &str, fragments: Vec<Fragment>) -> Result<CollectionInfo> {
        let safe = sanitize_name(name)?;
        let collection = Collection::new(&safe, fragments)?;
        let path = self.context_path(&safe)?;
        let content = serde_json::to_string_pretty(collection.fragments())?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", temp_path.display())))?;

        if let Err(e) = fs::rename(&temp_path, &path).await {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                warn!("Failed to remove {}: {cleanup}", temp_path.display());
            }
            return Err(StorageError::WriteFile(format!("{}: {e}", path.display())).into());
        }

        info!(
            "Saved context {safe} with {} fragments to {}",
            collection.len(),
            path.display()
        );
        self.info(&safe, &path).await
    }

    /// Load context `name`, validating its dimensionality.
    pub async fn load(&self, name: &str) -> Result<Collection> {
        let safe = sanitize_name(name)?;
        let path = self.context_path(&safe)?;

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ContextError::NotFound(safe));
            }
            Err(e) => {
                return Err(StorageError::ReadFile(format!("{}: {e}", path.display())).into());
            }
        };

        let fragments: Vec<Fragment> =
            serde_json::from_str(&content).map_err(|e| ContextError::CorruptCollection {
                name: safe.clone(),
                reason: e.to_string(),
            })?;

        let collection = Collection::new(safe, fragments)?;
        debug!(
            "Loaded context {} ({} fragments)",
            collection.name(),
            collection.len()
        );
        Ok(collection)
    }

    /// Delete context `name`. Returns the sanitized name that was removed.
    pub async fn delete(&self, name: &str) -> Result<String> {
        let safe = sanitize_name(name)?;
        let path = self.context_path(&safe)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted context {safe}");
                Ok(safe)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ContextError::NotFound(safe)),
            Err(e) => Err(StorageError::DeleteFile(format!("{}: {e}", path.display())).into()),
        }
    }

    /// List stored contexts, sorted by name.
    pub async fn list(&self) -> Result<Vec<CollectionInfo>> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", self.root.display())))?;

        let mut contexts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::ReadFile(format!("{e}")))?
        {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            match self.info(name, &path).await {
                Ok(info) => contexts.push(info),
                Err(e) => warn!("Failed to stat context file {}: {e}", path.display()),
            }
        }

        contexts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(contexts)
    }

    async fn info(&self, name: &str, path: &Path) -> Result<CollectionInfo> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", path.display())))?;

        Ok(CollectionInfo {
            name: name.to_string(),
            file_name: format!("{name}.{EXTENSION}"),
            path: path.to_path_buf(),
            size_bytes: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }
}
