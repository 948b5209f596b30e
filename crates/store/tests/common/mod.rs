use std::sync::Arc;

use folio_core::version::VersionAuthor;
use folio_store::{MemoryContentSource, SessionCoordinator, VersionStore};

pub const PATH: &str = "architecture/overview";

pub fn author(id: &str) -> VersionAuthor {
    VersionAuthor {
        id: id.to_string(),
        name: format!("User {id}"),
        email: format!("{id}@example.com"),
        role: "editor".to_string(),
        expertise: Vec::new(),
    }
}

/// Store with no source content; histories start at the first append.
#[allow(dead_code)]
pub fn empty_store() -> Arc<VersionStore> {
    Arc::new(VersionStore::new(Arc::new(MemoryContentSource::new()), 64))
}

/// Store whose source knows `PATH`.
#[allow(dead_code)]
pub fn seeded_store(content: &str) -> Arc<VersionStore> {
    let source = MemoryContentSource::new().with_content(PATH, content);
    Arc::new(VersionStore::new(Arc::new(source), 64))
}

#[allow(dead_code)]
pub fn coordinator(store: &Arc<VersionStore>) -> SessionCoordinator {
    SessionCoordinator::new(Arc::clone(store))
}
