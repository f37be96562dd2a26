//! Tracked wiki working copies
//!
//! A tracker owns one local clone of a wiki. Each poll pulls the remote
//! branch and reports the commits between the previous tip (the baseline)
//! and the new one. Rolling back resets the branch so that undelivered
//! commits show up again on the next poll.

use git2::{build::CheckoutBuilder, Oid, Repository, ResetType};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::commits::CommitInfo;
use super::diff::{diff_commits, DiffEntry};

pub struct RepositoryTracker {
    repo: Repository,
    name: String,
    path: PathBuf,
    branch: String,
    remote: String,
}

impl RepositoryTracker {
    /// Open an existing clone; the tracker is named after its directory
    pub fn open(path: &Path, branch: &str, remote: &str) -> Result<Self> {
        let repo = Repository::open(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::Config(format!("{} has no directory name", path.display())))?;

        Ok(Self {
            repo,
            name,
            path: path.to_path_buf(),
            branch: branch.to_string(),
            remote: remote.to_string(),
        })
    }

    /// Every `<root>/*/.git` clone, sorted by name
    pub fn discover(root: &Path, branch: &str, remote: &str) -> Result<Vec<Self>> {
        let pattern = format!("{}/*/.git", root.display());
        let entries = glob::glob(&pattern)
            .map_err(|e| Error::Config(format!("Invalid wiki root {}: {}", root.display(), e)))?;

        let mut trackers = Vec::new();
        for entry in entries {
            let git_dir = entry.map_err(|e| Error::Io(e.into_error()))?;
            if let Some(workdir) = git_dir.parent() {
                trackers.push(Self::open(workdir, branch, remote)?);
            }
        }
        trackers.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(trackers)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current tip of the checked out branch
    pub fn head(&self) -> Result<Oid> {
        Ok(self.repo.head()?.peel_to_commit()?.id())
    }

    /// Pull the remote branch and return everything from the previous tip
    /// (inclusive) to the new one, oldest first.
    ///
    /// When nothing was pushed the result holds only the previous tip.
    pub fn advance(&self) -> Result<Vec<CommitInfo>> {
        self.checkout()?;
        let baseline = self.head()?;
        self.pull()?;
        let tip = self.head()?;

        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(tip)?;
        revwalk.simplify_first_parent()?;

        let mut commits = Vec::new();
        let mut reached = false;
        for oid in revwalk {
            let oid = oid?;
            let commit = self.repo.find_commit(oid)?;
            commits.push(CommitInfo::from(&commit));
            if oid == baseline {
                reached = true;
                break;
            }
        }

        if !reached {
            return Err(Error::BaselineUnreachable {
                repo: self.name.clone(),
                baseline: baseline.to_string(),
                tip: tip.to_string(),
            });
        }

        commits.reverse();
        debug!(repo = %self.name, advanced = commits.len() - 1, "Walked new history");

        Ok(commits)
    }

    /// Hard reset the tracked branch `count` commits back
    pub fn rollback(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }

        let target = self.repo.revparse_single(&format!("HEAD~{}", count))?;
        warn!(
            repo = %self.name,
            count,
            target = %target.id(),
            "Rolling back undelivered commits"
        );
        self.repo.reset(&target, ResetType::Hard, None)?;

        Ok(())
    }

    /// File-level changes between two commits of this wiki
    pub fn diff(&self, from: Oid, to: Oid) -> Result<Vec<DiffEntry>> {
        diff_commits(&self.repo, from, to)
    }

    fn checkout(&self) -> Result<()> {
        let refname = format!("refs/heads/{}", self.branch);
        self.repo.set_head(&refname)?;
        self.repo.checkout_head(Some(CheckoutBuilder::new().safe()))?;
        Ok(())
    }

    /// Fast-forward to the remote branch. An unreachable remote leaves the
    /// branch where it is, so the wiki simply has nothing new this cycle.
    fn pull(&self) -> Result<()> {
        let mut remote = self.repo.find_remote(&self.remote)?;
        if let Err(e) = remote.fetch(&[self.branch.as_str()], None, None) {
            warn!(
                repo = %self.name,
                remote = %self.remote,
                error = %e,
                "Fetch failed, keeping the current tip"
            );
            return Ok(());
        }

        let fetch_head = self.repo.find_reference("FETCH_HEAD")?;
        let fetch_commit = self.repo.reference_to_annotated_commit(&fetch_head)?;
        let (analysis, _) = self.repo.merge_analysis(&[&fetch_commit])?;

        if analysis.is_up_to_date() {
            return Ok(());
        }

        if !analysis.is_fast_forward() {
            return Err(Error::Diverged {
                repo: self.name.clone(),
                remote: self.remote.clone(),
                branch: self.branch.clone(),
            });
        }

        let refname = format!("refs/heads/{}", self.branch);
        let mut reference = self.repo.find_reference(&refname)?;
        reference.set_target(fetch_commit.id(), "wiki-diff-notify: fast-forward")?;
        self.repo.set_head(&refname)?;
        self.repo.checkout_head(Some(CheckoutBuilder::new().force()))?;

        info!(repo = %self.name, tip = %fetch_commit.id(), "Pulled {}/{}", self.remote, self.branch);

        Ok(())
    }
}
