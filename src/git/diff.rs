//! File-level diff entries between two commits

use git2::{Delta, DiffDelta, DiffFile, DiffFindOptions, DiffOptions, Oid, Patch, Repository};

use crate::error::{Error, Result};

/// One changed file between two commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    before: Option<String>,
    after: Option<String>,
    patch: Vec<u8>,
}

impl DiffEntry {
    pub fn new(before: Option<String>, after: Option<String>, patch: Vec<u8>) -> Result<Self> {
        if before.is_none() && after.is_none() {
            return Err(Error::InvalidDiffEntry);
        }
        Ok(Self { before, after, patch })
    }

    /// Path before the change, absent for created files
    pub fn before(&self) -> Option<&str> {
        self.before.as_deref()
    }

    /// Path after the change, absent for removed files
    pub fn after(&self) -> Option<&str> {
        self.after.as_deref()
    }

    /// Hunk text of the change, empty for pure renames
    pub fn patch(&self) -> &[u8] {
        &self.patch
    }
}

/// Diff two commits with rename detection, one entry per changed file
pub fn diff_commits(repo: &Repository, from: Oid, to: Oid) -> Result<Vec<DiffEntry>> {
    let old_tree = repo.find_commit(from)?.tree()?;
    let new_tree = repo.find_commit(to)?.tree()?;

    let mut diff_opts = DiffOptions::new();
    let mut diff = repo.diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut diff_opts))?;

    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true);
    diff.find_similar(Some(&mut find_opts))?;

    let mut entries = Vec::new();
    for (idx, delta) in diff.deltas().enumerate() {
        let (before, after) = delta_paths(&delta);
        let patch = match Patch::from_diff(&diff, idx)? {
            Some(mut patch) => hunk_text(&mut patch)?,
            None => Vec::new(),
        };
        entries.push(DiffEntry::new(before, after, patch)?);
    }

    Ok(entries)
}

// libgit2 fills both sides of a delta with the same path for additions and
// deletions, so the missing side comes from the status.
fn delta_paths(delta: &DiffDelta<'_>) -> (Option<String>, Option<String>) {
    let before = path_of(&delta.old_file());
    let after = path_of(&delta.new_file());

    match delta.status() {
        Delta::Added | Delta::Untracked => (None, after),
        Delta::Deleted => (before, None),
        _ => (before, after),
    }
}

fn path_of(file: &DiffFile<'_>) -> Option<String> {
    file.path().map(|p| p.to_string_lossy().replace('\\', "/"))
}

fn hunk_text(patch: &mut Patch<'_>) -> Result<Vec<u8>> {
    let mut text = Vec::new();
    patch.print(&mut |_, _, line| {
        match line.origin() {
            // file headers
            'F' => {}
            origin @ ('+' | '-' | ' ') => {
                text.push(origin as u8);
                text.extend_from_slice(line.content());
            }
            _ => text.extend_from_slice(line.content()),
        }
        true
    })?;
    Ok(text)
}
