//! Poll cycle orchestration
//!
//! Each cycle pulls every tracked wiki, groups the new commits by author,
//! and posts one notification per changed page of each group. When the
//! sink refuses a notification the wiki is reset to the last fully
//! delivered commit and the remaining groups wait for the next cycle.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::classify::{classify, Classification};
use crate::dispatch::{Dispatched, NotificationDispatcher};
use crate::error::{Error, Result};
use crate::git::{CommitInfo, RepositoryTracker};
use crate::group::{group_commits, DeliveryCursor, NotificationUnit};
use crate::notifications::{ChannelDirectory, NotificationSink};

/// What one cycle did for one wiki
#[derive(Debug)]
pub enum RepoOutcome {
    UpToDate,
    Delivered { units: usize, notifications: usize },
    /// A notification failed; the wiki was reset by `depth` commits
    RolledBack {
        depth: usize,
        notifications: usize,
        error: Error,
    },
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub outcomes: Vec<(String, RepoOutcome)>,
}

impl CycleReport {
    pub fn outcome(&self, repo: &str) -> Option<&RepoOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == repo)
            .map(|(_, outcome)| outcome)
    }

    /// Notifications accepted by the sink during the cycle
    pub fn notifications(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, outcome)| match outcome {
                RepoOutcome::UpToDate => 0,
                RepoOutcome::Delivered { notifications, .. } => *notifications,
                RepoOutcome::RolledBack { notifications, .. } => *notifications,
            })
            .sum()
    }

    pub fn rolled_back(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, RepoOutcome::RolledBack { .. }))
            .count()
    }
}

pub struct WikiDiffNotifier<S> {
    sink: S,
    channels: ChannelDirectory,
    trackers: Vec<RepositoryTracker>,
    routes: BTreeMap<String, String>,
    markdown_suffix: String,
}

impl<S: NotificationSink> WikiDiffNotifier<S> {
    /// `routes` maps wiki names to channel names. Every route must point at
    /// a tracked wiki and a known channel, and every wiki needs a route.
    pub fn new(
        sink: S,
        channels: ChannelDirectory,
        trackers: Vec<RepositoryTracker>,
        routes: BTreeMap<String, String>,
        markdown_suffix: &str,
    ) -> Result<Self> {
        let notifier = Self {
            sink,
            channels,
            trackers,
            routes,
            markdown_suffix: markdown_suffix.to_string(),
        };
        notifier.validate()?;

        Ok(notifier)
    }

    fn validate(&self) -> Result<()> {
        let names: HashSet<&str> = self.trackers.iter().map(|t| t.name()).collect();

        for (repo, channel) in &self.routes {
            if !names.contains(repo.as_str()) {
                return Err(Error::Config(format!("Wiki '{}' does not exist", repo)));
            }
            self.channels.require(channel)?;
        }

        for tracker in &self.trackers {
            if !self.routes.contains_key(tracker.name()) {
                return Err(Error::Config(format!(
                    "Wiki '{}' at {} has no channel in notify_to",
                    tracker.name(),
                    tracker.path().display()
                )));
            }
        }

        info!(wikis = self.trackers.len(), "Validation of configuration has been done");
        Ok(())
    }

    pub fn trackers(&self) -> &[RepositoryTracker] {
        &self.trackers
    }

    /// Run one poll cycle over every wiki.
    ///
    /// Failed deliveries are rolled back and reported per wiki; anything
    /// else (git integrity, archived channel) aborts the cycle with `Err`.
    pub fn notify(&self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        for tracker in &self.trackers {
            let outcome = self.notify_repository(tracker)?;
            if let RepoOutcome::RolledBack { depth, error, .. } = &outcome {
                warn!(
                    repo = %tracker.name(),
                    depth,
                    error = %error,
                    "Delivery failed, remaining commits will be retried next cycle"
                );
            }
            report.outcomes.push((tracker.name().to_string(), outcome));
        }

        Ok(report)
    }

    fn notify_repository(&self, tracker: &RepositoryTracker) -> Result<RepoOutcome> {
        let commits = tracker.advance()?;
        let mut cursor = DeliveryCursor::new(commits.len());

        let channel_name = self.route(tracker.name())?;
        let channel = match self.channels.ensure_active(&self.sink, channel_name) {
            Ok(channel) => channel,
            Err(e) => {
                // nothing was delivered, keep the new commits for later
                rollback_after(tracker, cursor.rollback_depth(), &e)?;
                return Err(e);
            }
        };

        if commits.len() <= 1 {
            debug!(repo = %tracker.name(), "No new commits");
            return Ok(RepoOutcome::UpToDate);
        }

        let units = group_commits(&commits);
        info!(
            repo = %tracker.name(),
            commits = commits.len() - 1,
            units = units.len(),
            "New commits"
        );

        let dispatcher = NotificationDispatcher::new(&self.sink, channel);
        let mut notifications = 0;

        for unit in &units {
            match self.deliver_unit(tracker, &dispatcher, &commits, unit) {
                Ok(sent) => {
                    notifications += sent;
                    cursor.complete(unit);
                }
                Err(e) => {
                    let depth = cursor.rollback_depth();
                    rollback_after(tracker, depth, &e)?;
                    if !e.is_delivery() {
                        error!(repo = %tracker.name(), error = %e, "Notification cycle aborted");
                        return Err(e);
                    }
                    return Ok(RepoOutcome::RolledBack {
                        depth,
                        notifications,
                        error: e,
                    });
                }
            }
        }

        Ok(RepoOutcome::Delivered {
            units: units.len(),
            notifications,
        })
    }

    fn deliver_unit(
        &self,
        tracker: &RepositoryTracker,
        dispatcher: &NotificationDispatcher<'_, S>,
        commits: &[CommitInfo],
        unit: &NotificationUnit,
    ) -> Result<usize> {
        let base = &commits[unit.base];
        let head = &commits[unit.head];
        let mut sent = 0;

        for entry in tracker.diff(base.id, head.id)? {
            let event = classify(&entry, &self.markdown_suffix);
            if event == Classification::Ignored {
                debug!(
                    before = entry.before().unwrap_or("-"),
                    after = entry.after().unwrap_or("-"),
                    "Skipping change"
                );
                continue;
            }
            if let Dispatched::Sent(_) = dispatcher.dispatch(head, &event)? {
                sent += 1;
            }
        }

        Ok(sent)
    }

    fn route(&self, repo: &str) -> Result<&str> {
        self.routes
            .get(repo)
            .map(|s| s.as_str())
            .ok_or_else(|| Error::Config(format!("Wiki '{}' has no channel in notify_to", repo)))
    }

    /// Post a message outside the poll loop, to one wiki's channel or to
    /// every configured channel. Returns the number of channels reached.
    pub fn send_message(&self, repo: Option<&str>, text: &str) -> Result<usize> {
        let targets: BTreeSet<&str> = match repo {
            Some(name) => BTreeSet::from([self.route(name)?]),
            None => self.routes.values().map(|s| s.as_str()).collect(),
        };

        for name in &targets {
            let channel = self.channels.ensure_active(&self.sink, name)?;
            let response = self.sink.post_message(channel, text)?;
            if !response.ok {
                error!(channel = %name, payload = %response.payload, "Message was not accepted");
                return Err(Error::Sink {
                    method: "post_message".to_string(),
                    payload: response.payload,
                });
            }
            info!(channel = %name, "Message sent");
        }

        Ok(targets.len())
    }

    /// Poll forever, returning only on a fatal error
    pub fn run(&self, interval: Duration) -> Result<()> {
        loop {
            let report = self.notify()?;
            info!(
                notifications = report.notifications(),
                rolled_back = report.rolled_back(),
                next_in_secs = interval.as_secs(),
                "Cycle finished"
            );
            thread::sleep(interval);
        }
    }
}

/// Reset `tracker` by `depth` commits after `cause` stopped delivery. If the
/// reset fails too, the returned error still carries `cause`.
fn rollback_after(tracker: &RepositoryTracker, depth: usize, cause: &Error) -> Result<()> {
    tracker.rollback(depth).map_err(|e| {
        error!(
            repo = %tracker.name(),
            depth,
            cause = %cause,
            error = %e,
            "Rollback failed"
        );
        Error::RollbackFailed {
            repo: tracker.name().to_string(),
            depth,
            cause: cause.to_string(),
            source: Box::new(e),
        }
    })
}
