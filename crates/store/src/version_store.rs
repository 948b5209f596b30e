//! Per-path version ledger with serialized writers.
//!
//! [`VersionStore`] owns one [`VersionHistory`] per content path, each behind
//! its own `tokio::sync::Mutex`. Every writer of a path (appends, publish,
//! review, rollback, branch operations, session commits) goes through
//! [`VersionStore::write`], which holds that path's lock for the whole
//! read-modify-append. Different paths never contend.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use folio_core::analytics::{compute_analytics, ContentAnalytics};
use folio_core::content::validate_content_path;
use folio_core::diff::{diff_versions, VersionDiff};
use folio_core::error::CoreError;
use folio_core::types::EntityId;
use folio_core::version::{
    ChangeRecord, ChangeType, ContentVersion, NewVersion, VersionAuthor, VersionHistory,
};

use crate::diff_cache::DiffCache;
use crate::source::ContentSource;

type HistorySlot = Arc<Mutex<VersionHistory>>;

pub struct VersionStore {
    histories: RwLock<HashMap<String, HistorySlot>>,
    source: Arc<dyn ContentSource>,
    diff_cache: DiffCache,
}

impl VersionStore {
    pub fn new(source: Arc<dyn ContentSource>, diff_cache_capacity: usize) -> Self {
        Self {
            histories: RwLock::new(HashMap::new()),
            source,
            diff_cache: DiffCache::new(diff_cache_capacity),
        }
    }

    pub fn diff_cache(&self) -> &DiffCache {
        &self.diff_cache
    }

    // -----------------------------------------------------------------------
    // Slots
    // -----------------------------------------------------------------------

    async fn slot(&self, path: &str) -> Option<HistorySlot> {
        self.histories.read().await.get(path).cloned()
    }

    async fn seed(&self, path: &str) -> Result<VersionHistory, CoreError> {
        let mut history = VersionHistory::new(path);
        match self.source.load_raw_content(path).await {
            Ok(raw) => {
                let first = history.append(
                    NewVersion::draft(raw.content, VersionAuthor::system())
                        .with_title(raw.metadata.title)
                        .with_change(ChangeRecord::document(
                            ChangeType::Initial,
                            "Imported from content source",
                        )),
                )?;
                tracing::info!(
                    content_path = path,
                    version_id = %first.id,
                    origin = ?raw.metadata.origin,
                    "Seeded history from content source"
                );
            }
            Err(CoreError::NotFound { .. }) => {
                tracing::debug!(content_path = path, "No source content, starting empty history");
            }
            Err(e) => return Err(e),
        }
        Ok(history)
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    /// Run `f` with exclusive access to the path's history, seeding it first
    /// when the path is new. `f` must not mutate on failure.
    ///
    /// A path the content source knows nothing about only gets a slot once
    /// `f` leaves at least one version behind.
    pub async fn write<T, F>(&self, path: &str, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut VersionHistory) -> Result<T, CoreError>,
    {
        if let Some(slot) = self.slot(path).await {
            let mut history = slot.lock().await;
            return f(&mut history);
        }
        validate_content_path(path)?;

        let seeded = self.seed(path).await?;
        let mut histories = self.histories.write().await;
        let existing = histories.get(path).cloned();
        if let Some(slot) = existing {
            drop(histories);
            let mut history = slot.lock().await;
            return f(&mut history);
        }

        let mut history = seeded;
        let result = f(&mut history);
        if !history.versions.is_empty() {
            histories.insert(path.to_string(), Arc::new(Mutex::new(history)));
        }
        result
    }

    /// Run `f` against the path's history. `NotFound` when the path has none.
    pub async fn read<T, F>(&self, path: &str, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&VersionHistory) -> Result<T, CoreError>,
    {
        let slot = self
            .slot(path)
            .await
            .ok_or_else(|| CoreError::not_found("VersionHistory", path))?;
        let history = slot.lock().await;
        if history.versions.is_empty() {
            return Err(CoreError::not_found("VersionHistory", path));
        }
        f(&history)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    pub async fn get_history(&self, path: &str) -> Result<VersionHistory, CoreError> {
        self.read(path, |h| Ok(h.clone())).await
    }

    /// History for `path`, seeding the first version from the content source
    /// when absent. `NotFound` when neither exists.
    pub async fn get_or_init_history(&self, path: &str) -> Result<VersionHistory, CoreError> {
        let history = self.write(path, |h| Ok(h.clone())).await?;
        if history.versions.is_empty() {
            return Err(CoreError::not_found("VersionHistory", path));
        }
        Ok(history)
    }

    pub async fn append_version(
        &self,
        path: &str,
        input: NewVersion,
    ) -> Result<ContentVersion, CoreError> {
        let version = self.write(path, |h| h.append(input)).await?;
        tracing::info!(
            content_path = path,
            version = version.version,
            version_id = %version.id,
            status = %version.status,
            "Version appended"
        );
        Ok(version)
    }

    pub async fn get_version(&self, path: &str, id: EntityId) -> Result<ContentVersion, CoreError> {
        self.read(path, |h| h.require(id).cloned()).await
    }

    /// Number of paths holding a history.
    pub async fn history_count(&self) -> usize {
        self.histories.read().await.len()
    }

    /// Paths with at least one version, sorted.
    pub async fn list_paths(&self) -> Vec<String> {
        let slots: Vec<(String, HistorySlot)> = self
            .histories
            .read()
            .await
            .iter()
            .map(|(path, slot)| (path.clone(), Arc::clone(slot)))
            .collect();

        let mut paths = Vec::with_capacity(slots.len());
        for (path, slot) in slots {
            if !slot.lock().await.versions.is_empty() {
                paths.push(path);
            }
        }
        paths.sort();
        paths
    }

    /// Section diff between two versions of `path`, memoized by id pair.
    ///
    /// The path lock is held only to copy the two versions out.
    pub async fn generate_diff(
        &self,
        path: &str,
        from_id: EntityId,
        to_id: EntityId,
    ) -> Result<VersionDiff, CoreError> {
        let (from, to) = self
            .read(path, |h| Ok((h.require(from_id)?.clone(), h.require(to_id)?.clone())))
            .await?;

        if let Some(diff) = self.diff_cache.get(from_id, to_id) {
            tracing::debug!(content_path = path, %from_id, %to_id, "Diff cache hit");
            return Ok(diff);
        }

        let diff = diff_versions(&from, &to);
        self.diff_cache.insert(diff.clone());
        Ok(diff)
    }

    pub async fn analytics(&self, path: &str) -> Result<ContentAnalytics, CoreError> {
        self.read(path, |h| Ok(compute_analytics(h))).await
    }
}
