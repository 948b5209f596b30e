//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async operations that
//! accept `&VersionStore` as the first argument and run the pure domain
//! logic from `folio_core` under the path's write lock.

pub mod branch_repo;
pub mod publish_repo;

pub use branch_repo::BranchRepo;
pub use publish_repo::PublishRepo;
