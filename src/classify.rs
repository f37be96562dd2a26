//! Classification of diff entries into wiki page events

use std::borrow::Cow;

use crate::git::DiffEntry;

pub const MARKDOWN_SUFFIX: &str = ".md";

/// What happened to a wiki page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification<'a> {
    Created { path: &'a str, patch: Cow<'a, str> },
    Updated { path: &'a str, patch: Cow<'a, str> },
    Renamed { from: &'a str, to: &'a str },
    Removed { path: &'a str },
    /// Not a markdown page, or nothing worth reporting
    Ignored,
}

impl Classification<'_> {
    /// Human readable line for the chat channel
    pub fn message(&self, author: &str) -> Option<String> {
        match self {
            Classification::Created { path, .. } => {
                Some(format!("{} is created by {}", path, author))
            }
            Classification::Updated { path, .. } => {
                Some(format!("{} is updated by {}", path, author))
            }
            Classification::Renamed { from, to } => {
                Some(format!("{} is renamed to {} by {}", from, to, author))
            }
            Classification::Removed { path } => Some(format!("{} is removed by {}", path, author)),
            Classification::Ignored => None,
        }
    }

    /// Patch text to upload, if the event carries one
    pub fn patch(&self) -> Option<&str> {
        match self {
            Classification::Created { patch, .. } | Classification::Updated { patch, .. } => {
                Some(patch.as_ref())
            }
            _ => None,
        }
    }
}

/// Classify one entry of a unit's diff
pub fn classify<'a>(entry: &'a DiffEntry, markdown_suffix: &str) -> Classification<'a> {
    let is_page = |path: Option<&str>| path.is_some_and(|p| p.ends_with(markdown_suffix));
    if !is_page(entry.before()) && !is_page(entry.after()) {
        return Classification::Ignored;
    }

    let patch = entry.patch();
    match (entry.before(), entry.after()) {
        (Some(path), None) => Classification::Removed { path },
        (None, Some(path)) => Classification::Created {
            path,
            patch: String::from_utf8_lossy(patch),
        },
        (Some(from), Some(to)) if from != to && patch.is_empty() => {
            Classification::Renamed { from, to }
        }
        (Some(_), Some(path)) if !patch.is_empty() => Classification::Updated {
            path,
            patch: String::from_utf8_lossy(patch),
        },
        // same path without hunks, e.g. a mode change
        _ => Classification::Ignored,
    }
}
