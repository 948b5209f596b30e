//! Shared query parameter types for API handlers.

use serde::Deserialize;

use folio_core::types::EntityId;

/// `?path=` addressing every content endpoint.
#[derive(Debug, Deserialize)]
pub struct PathParams {
    pub path: String,
}

/// `?path=&from=&to=` for the diff endpoint.
#[derive(Debug, Deserialize)]
pub struct DiffParams {
    pub path: String,
    pub from: EntityId,
    pub to: EntityId,
}

/// Optional `?path=` filter.
#[derive(Debug, Deserialize)]
pub struct OptionalPathParams {
    pub path: Option<String>,
}

/// `?path=&limit=` for the activity feed.
#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    pub path: Option<String>,
    pub limit: Option<usize>,
}
