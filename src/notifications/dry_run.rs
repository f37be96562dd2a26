//! Dry-run sink used by `--debug`

use serde_json::json;
use tracing::info;

use crate::error::Result;

use super::{Channel, NotificationSink, PatchUpload, SinkResponse};

/// Reads go to the wrapped sink, writes are only logged
pub struct DryRunSink<S> {
    inner: S,
}

impl<S> DryRunSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: NotificationSink> NotificationSink for DryRunSink<S> {
    fn list_channels(&self) -> Result<Vec<Channel>> {
        self.inner.list_channels()
    }

    fn is_archived(&self, channel: &Channel) -> Result<bool> {
        self.inner.is_archived(channel)
    }

    fn post_message(&self, channel: &Channel, text: &str) -> Result<SinkResponse> {
        info!(channel = %channel.name, id = %channel.id, text, "[dry-run] post_message");
        Ok(SinkResponse::from(json!({"ok": true, "dry_run": true})))
    }

    fn upload_patch(&self, channel: &Channel, upload: &PatchUpload) -> Result<SinkResponse> {
        info!(
            channel = %channel.name,
            id = %channel.id,
            comment = %upload.comment,
            title = %upload.title,
            filetype = %upload.filetype,
            "[dry-run] upload_patch\n{}",
            upload.content
        );
        Ok(SinkResponse::from(json!({"ok": true, "dry_run": true})))
    }
}
