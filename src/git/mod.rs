//! Git operations module
//!
//! Provides:
//! - Tracked wiki clones (pull, history walk, rollback)
//! - Commit metadata
//! - File-level diffs with patch text

pub mod commits;
pub mod diff;
pub mod tracker;

pub use commits::{Author, CommitInfo};
pub use diff::{diff_commits, DiffEntry};
pub use tracker::RepositoryTracker;
