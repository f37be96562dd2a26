//! Grouping of new commits into notification units
//!
//! Consecutive commits by the same author collapse into one unit. A unit's
//! diff runs straight from the commit before the run to the run's last
//! commit, so changes an author makes and then reverts within one run are
//! never reported.

use crate::git::CommitInfo;

/// One diff-and-notify step: `commits[base] -> commits[head]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationUnit {
    pub base: usize,
    pub head: usize,
}

impl NotificationUnit {
    /// Number of commits the unit covers
    pub fn len(&self) -> usize {
        self.head - self.base
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.base
    }
}

/// Cut `commits[1..]` into same-author runs; `commits[0]` is the baseline
/// that was already delivered.
pub fn group_commits(commits: &[CommitInfo]) -> Vec<NotificationUnit> {
    let mut units = Vec::new();
    let mut base = 0;

    for i in 1..commits.len() {
        let is_last = i + 1 == commits.len();
        if !is_last && commits[i].author == commits[i + 1].author {
            continue;
        }
        units.push(NotificationUnit { base, head: i });
        base = i;
    }

    units
}

/// Tracks how far delivery got within one cycle
#[derive(Debug, Clone, Copy)]
pub struct DeliveryCursor {
    advanced: usize,
    delivered: usize,
}

impl DeliveryCursor {
    /// `advanced` is the length of the commit list, baseline included
    pub fn new(advanced: usize) -> Self {
        Self {
            advanced,
            delivered: 0,
        }
    }

    pub fn complete(&mut self, unit: &NotificationUnit) {
        self.delivered = unit.head;
    }

    /// Index of the last commit whose notifications all went out
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Commits above the last delivered one, i.e. how far to reset the
    /// branch so the next poll starts from there.
    pub fn rollback_depth(&self) -> usize {
        self.advanced.saturating_sub(1 + self.delivered)
    }
}
