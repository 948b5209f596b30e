//! Stateful engine around the pure `folio_core` domain.
//!
//! - [`VersionStore`] owns one locked [`VersionHistory`](folio_core::version::VersionHistory)
//!   per content path plus the diff cache.
//! - [`ContentSource`] seeds the first version of a path.
//! - [`repositories`] run branch and publish workflows under the path lock.
//! - [`SessionCoordinator`] holds live collaborative sessions.

pub mod diff_cache;
pub mod repositories;
pub mod sessions;
pub mod source;
pub mod version_store;

pub use diff_cache::DiffCache;
pub use repositories::{BranchRepo, PublishRepo};
pub use sessions::{SessionCoordinator, SessionEnd, SessionOutcome};
pub use source::{ContentMetadata, ContentSource, FsContentSource, MemoryContentSource, RawContent};
pub use version_store::VersionStore;
