pub mod activity;
pub mod analytics;
pub mod branches;
pub mod sessions;
pub mod versions;
