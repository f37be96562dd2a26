//! Notifications module
//!
//! Provides:
//! - The notification sink abstraction
//! - Slack Web API sink
//! - Dry-run sink for `--debug`
//! - Channel directory and archival checks

mod channels;
mod dry_run;
mod slack;

pub use channels::*;
pub use dry_run::*;
pub use slack::*;

use serde_json::Value;

use crate::error::Result;

/// A chat channel notifications can go to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    pub id: String,
    pub private: bool,
}

/// A patch posted as a file snippet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchUpload {
    pub comment: String,
    pub title: String,
    pub content: String,
    pub filetype: String,
}

impl PatchUpload {
    pub fn diff(comment: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            title: title.into(),
            content: content.into(),
            filetype: "diff".to_string(),
        }
    }
}

/// Raw answer of the sink; `ok` is its explicit success flag
#[derive(Debug, Clone, PartialEq)]
pub struct SinkResponse {
    pub ok: bool,
    pub payload: Value,
}

impl From<Value> for SinkResponse {
    fn from(payload: Value) -> Self {
        let ok = payload.get("ok").and_then(Value::as_bool).unwrap_or(false);
        Self { ok, payload }
    }
}

/// The chat service notifications are delivered to
pub trait NotificationSink {
    /// Every visible, non-archived channel, public and private
    fn list_channels(&self) -> Result<Vec<Channel>>;

    fn is_archived(&self, channel: &Channel) -> Result<bool>;

    fn post_message(&self, channel: &Channel, text: &str) -> Result<SinkResponse>;

    fn upload_patch(&self, channel: &Channel, upload: &PatchUpload) -> Result<SinkResponse>;
}

impl<S: NotificationSink + ?Sized> NotificationSink for &S {
    fn list_channels(&self) -> Result<Vec<Channel>> {
        (**self).list_channels()
    }

    fn is_archived(&self, channel: &Channel) -> Result<bool> {
        (**self).is_archived(channel)
    }

    fn post_message(&self, channel: &Channel, text: &str) -> Result<SinkResponse> {
        (**self).post_message(channel, text)
    }

    fn upload_patch(&self, channel: &Channel, upload: &PatchUpload) -> Result<SinkResponse> {
        (**self).upload_patch(channel, upload)
    }
}
