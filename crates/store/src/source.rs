//! Content source collaborator used to seed the first version of a path.
//!
//! The engine only consults the source when a path has no history yet.
//! [`FsContentSource`] reads markdown files from a directory tree;
//! [`MemoryContentSource`] serves fixed content for tests and embedding.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use folio_core::error::CoreError;
use folio_core::types::Timestamp;

/// Extension appended to a content path to find its file.
pub const CONTENT_FILE_EXTENSION: &str = "md";

/// Descriptive data returned with raw content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMetadata {
    /// Title to give the seeded version, if the source knows one.
    pub title: Option<String>,
    /// Where the content came from (file path, URL, ...).
    pub origin: Option<String>,
    pub modified_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContent {
    pub content: String,
    pub metadata: ContentMetadata,
}

/// Fetches the raw content of a path.
///
/// Returns [`CoreError::NotFound`] when the source has nothing for the path.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn load_raw_content(&self, path: &str) -> Result<RawContent, CoreError>;
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

/// Reads `<root>/<path>.md`.
#[derive(Debug, Clone)]
pub struct FsContentSource {
    root: PathBuf,
}

impl FsContentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn file_path(&self, path: &str) -> PathBuf {
        self.root.join(format!("{path}.{CONTENT_FILE_EXTENSION}"))
    }
}

#[async_trait]
impl ContentSource for FsContentSource {
    async fn load_raw_content(&self, path: &str) -> Result<RawContent, CoreError> {
        let file = self.file_path(path);
        let content = match tokio::fs::read_to_string(&file).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoreError::not_found("Content", path));
            }
            Err(e) => {
                return Err(CoreError::Internal(format!(
                    "Failed to read {}: {e}",
                    file.display()
                )));
            }
        };

        let modified_at = tokio::fs::metadata(&file)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);

        tracing::debug!(content_path = path, file = %file.display(), "Loaded raw content");

        Ok(RawContent {
            content,
            metadata: ContentMetadata {
                title: None,
                origin: Some(file.display().to_string()),
                modified_at,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Serves content from a fixed map.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentSource {
    entries: HashMap<String, RawContent>,
}

impl MemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add content for `path`.
    pub fn with_content(mut self, path: &str, content: &str) -> Self {
        self.entries.insert(
            path.to_string(),
            RawContent {
                content: content.to_string(),
                metadata: ContentMetadata {
                    origin: Some("memory".to_string()),
                    ..Default::default()
                },
            },
        );
        self
    }

    /// Add content for `path` with an explicit title.
    pub fn with_titled_content(mut self, path: &str, title: &str, content: &str) -> Self {
        self = self.with_content(path, content);
        if let Some(entry) = self.entries.get_mut(path) {
            entry.metadata.title = Some(title.to_string());
        }
        self
    }
}

#[async_trait]
impl ContentSource for MemoryContentSource {
    async fn load_raw_content(&self, path: &str) -> Result<RawContent, CoreError> {
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| CoreError::not_found("Content", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn memory_source_serves_known_paths() {
        let source = MemoryContentSource::new().with_titled_content("docs/a", "A", "# A\n");
        let raw = source.load_raw_content("docs/a").await.unwrap();
        assert_eq!(raw.content, "# A\n");
        assert_eq!(raw.metadata.title.as_deref(), Some("A"));
        assert_matches!(
            source.load_raw_content("docs/b").await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn fs_source_reads_markdown_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("architecture")).unwrap();
        std::fs::write(dir.path().join("architecture/overview.md"), "# Overview\n").unwrap();

        let source = FsContentSource::new(dir.path());
        let raw = source.load_raw_content("architecture/overview").await.unwrap();
        assert_eq!(raw.content, "# Overview\n");
        assert!(raw.metadata.modified_at.is_some());
        assert_matches!(
            source.load_raw_content("architecture/missing").await,
            Err(CoreError::NotFound { .. })
        );
    }
}
