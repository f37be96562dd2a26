//! Commit metadata read from wiki history

use chrono::{DateTime, TimeZone, Utc};
use git2::{Commit, Oid};
use std::fmt;

/// Who wrote a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Information about a commit
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub id: Oid,
    pub author: Author,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

impl CommitInfo {
    pub fn short_id(&self) -> String {
        self.id.to_string()[..7].to_string()
    }
}

impl From<&Commit<'_>> for CommitInfo {
    fn from(commit: &Commit<'_>) -> Self {
        let author = commit.author();
        let timestamp = Utc
            .timestamp_opt(commit.time().seconds(), 0)
            .single()
            .unwrap_or_else(Utc::now);

        Self {
            id: commit.id(),
            author: Author::new(
                author.name().unwrap_or("Unknown"),
                author.email().unwrap_or(""),
            ),
            summary: commit.summary().unwrap_or("").to_string(),
            timestamp,
        }
    }
}
