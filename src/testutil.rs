//! Shared fixtures for tests: an upstream wiki repository, clones of it, and
//! a fake notification sink.

use git2::{Commit, Index, Oid, Repository, RepositoryInitOptions, Signature};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::git::RepositoryTracker;
use crate::notifications::{Channel, NotificationSink, PatchUpload, SinkResponse};

/// An upstream wiki plus a directory that holds tracked clones of it
pub struct WikiFixture {
    dir: TempDir,
    upstream: Repository,
}

impl WikiFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("master");
        let upstream = Repository::init_opts(dir.path().join("upstream"), &opts).unwrap();
        Self { dir, upstream }
    }

    pub fn upstream(&self) -> &Repository {
        &self.upstream
    }

    /// Directory the clones live in, one subdirectory per wiki
    pub fn wikis_root(&self) -> PathBuf {
        self.dir.path().join("wikis")
    }

    /// Clone the upstream into `<wikis_root>/<name>`
    pub fn clone_as(&self, name: &str) -> PathBuf {
        let dest = self.wikis_root().join(name);
        let url = self.upstream.workdir().unwrap().to_str().unwrap().to_string();
        Repository::clone(&url, &dest).unwrap();
        dest
    }

    pub fn tracker(&self, name: &str) -> RepositoryTracker {
        let path = self.wikis_root().join(name);
        if !path.exists() {
            self.clone_as(name);
        }
        RepositoryTracker::open(&path, "master", "origin").unwrap()
    }

    /// Point the clone's origin at a path that is not a repository
    pub fn break_remote(&self, name: &str) {
        let clone = Repository::open(self.wikis_root().join(name)).unwrap();
        let missing = self.dir.path().join("missing-remote");
        clone.remote_set_url("origin", missing.to_str().unwrap()).unwrap();
    }

    pub fn commit(&self, author: &str, files: &[(&str, &str)], message: &str) -> Oid {
        self.write_commit(author, message, |index, workdir| {
            for (path, content) in files {
                let full = workdir.join(path);
                if let Some(parent) = full.parent() {
                    fs::create_dir_all(parent).unwrap();
                }
                fs::write(&full, content).unwrap();
                index.add_path(Path::new(path)).unwrap();
            }
        })
    }

    pub fn remove(&self, author: &str, path: &str, message: &str) -> Oid {
        self.write_commit(author, message, |index, workdir| {
            fs::remove_file(workdir.join(path)).unwrap();
            index.remove_path(Path::new(path)).unwrap();
        })
    }

    pub fn rename(&self, author: &str, from: &str, to: &str, message: &str) -> Oid {
        self.write_commit(author, message, |index, workdir| {
            fs::rename(workdir.join(from), workdir.join(to)).unwrap();
            index.remove_path(Path::new(from)).unwrap();
            index.add_path(Path::new(to)).unwrap();
        })
    }

    fn write_commit(&self, author: &str, message: &str, edit: impl FnOnce(&mut Index, &Path)) -> Oid {
        let workdir = self.upstream.workdir().unwrap().to_path_buf();
        let mut index = self.upstream.index().unwrap();
        edit(&mut index, &workdir);
        index.write().unwrap();

        let tree = self.upstream.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now(author, &format!("{}@example.com", author)).unwrap();
        let parent = self.upstream.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&Commit> = parent.iter().collect();

        self.upstream
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }
}

/// A call the fake sink received
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Message { channel: String, text: String },
    Upload { channel: String, upload: PatchUpload },
}

/// How the fake sink fails a write
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Failure {
    /// Answer with `ok: false`
    Refused,
    /// Return an `Error::Http` without a response
    Transport,
}

/// Sink that records writes and can fail the n-th one
#[derive(Default)]
pub struct RecordingSink {
    pub channels: Vec<Channel>,
    pub archived: RefCell<Vec<String>>,
    pub calls: RefCell<Vec<SinkCall>>,
    fail_on: Cell<Option<(usize, Failure)>>,
    writes: Cell<usize>,
}

impl RecordingSink {
    pub fn with_channels(names: &[&str]) -> Self {
        let channels = names
            .iter()
            .enumerate()
            .map(|(i, name)| Channel {
                name: name.to_string(),
                id: format!("C{:04}", i),
                private: false,
            })
            .collect();
        Self {
            channels,
            ..Default::default()
        }
    }

    /// Answer the n-th write (1-based, counted from now) with `ok: false`
    pub fn fail_on_write(&self, n: usize) {
        self.fail_on.set(Some((self.writes.get() + n, Failure::Refused)));
    }

    /// Fail the n-th write (1-based, counted from now) before any response
    pub fn drop_on_write(&self, n: usize) {
        self.fail_on.set(Some((self.writes.get() + n, Failure::Transport)));
    }

    pub fn heal(&self) {
        self.fail_on.set(None);
    }

    pub fn archive(&self, name: &str) {
        self.archived.borrow_mut().push(name.to_string());
    }

    pub fn take_calls(&self) -> Vec<SinkCall> {
        self.calls.borrow_mut().drain(..).collect()
    }

    fn record(&self, call: SinkCall) -> Result<SinkResponse> {
        self.writes.set(self.writes.get() + 1);
        match self.fail_on.get() {
            Some((n, Failure::Refused)) if n == self.writes.get() => {
                return Ok(SinkResponse::from(json!({"ok": false, "error": "ratelimited"})));
            }
            Some((n, Failure::Transport)) if n == self.writes.get() => {
                return Err(Error::Http(transport_error()));
            }
            _ => {}
        }
        self.calls.borrow_mut().push(call);
        Ok(SinkResponse::from(json!({"ok": true})))
    }
}

/// A request error produced locally, without touching the network
fn transport_error() -> reqwest::Error {
    reqwest::blocking::Client::new()
        .get("not a url")
        .send()
        .unwrap_err()
}

impl NotificationSink for RecordingSink {
    fn list_channels(&self) -> Result<Vec<Channel>> {
        let archived = self.archived.borrow();
        Ok(self
            .channels
            .iter()
            .filter(|c| !archived.contains(&c.name))
            .cloned()
            .collect())
    }

    fn is_archived(&self, channel: &Channel) -> Result<bool> {
        Ok(self.archived.borrow().contains(&channel.name))
    }

    fn post_message(&self, channel: &Channel, text: &str) -> Result<SinkResponse> {
        self.record(SinkCall::Message {
            channel: channel.name.clone(),
            text: text.to_string(),
        })
    }

    fn upload_patch(&self, channel: &Channel, upload: &PatchUpload) -> Result<SinkResponse> {
        self.record(SinkCall::Upload {
            channel: channel.name.clone(),
            upload: upload.clone(),
        })
    }
}
