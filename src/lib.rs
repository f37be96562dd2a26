//! wiki-diff-notify - wiki change notifications for Slack
//!
//! A library for watching git mirrors of wikis and posting their changes:
//! - Pulling tracked clones and walking the newly arrived history
//! - Grouping consecutive commits by the same author
//! - Classifying per-file diffs into created/updated/renamed/removed pages
//! - Posting messages and diff snippets to Slack channels
//! - Rolling back undelivered commits so the next poll retries them

pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod git;
pub mod group;
pub mod logging;
pub mod notifications;
pub mod notifier;

#[cfg(test)]
pub(crate) mod testutil;

pub use classify::{classify, Classification, MARKDOWN_SUFFIX};
pub use config::Config;
pub use dispatch::{Dispatched, NotificationDispatcher};
pub use error::{Error, Result};
pub use git::{Author, CommitInfo, DiffEntry, RepositoryTracker};
pub use group::{group_commits, DeliveryCursor, NotificationUnit};
pub use notifications::{
    Channel, ChannelDirectory, DryRunSink, NotificationSink, PatchUpload, SinkResponse, SlackClient,
};
pub use notifier::{CycleReport, RepoOutcome, WikiDiffNotifier};
