//! Folio core domain: version ledger models, structural diffing, merge
//! planning, status transitions, session change folding and analytics.
//!
//! Everything in this crate is pure. Locking, storage and the content
//! collaborator live in `folio-store`; the HTTP surface lives in `folio-api`.

pub mod analytics;
pub mod branching;
pub mod collaboration;
pub mod content;
pub mod diff;
pub mod error;
pub mod publishing;
pub mod sections;
pub mod types;
pub mod version;
