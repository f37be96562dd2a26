//! Delivery of classified diff entries to the sink

use tracing::{debug, error, info};

use crate::classify::Classification;
use crate::error::{Error, Result};
use crate::git::CommitInfo;
use crate::notifications::{Channel, NotificationSink, PatchUpload, SinkResponse};

/// Outcome of dispatching one entry
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Sent(SinkResponse),
    Skipped,
}

/// Sends the notifications of one repository to its channel
pub struct NotificationDispatcher<'a, S> {
    sink: &'a S,
    channel: &'a Channel,
}

impl<'a, S: NotificationSink> NotificationDispatcher<'a, S> {
    pub fn new(sink: &'a S, channel: &'a Channel) -> Self {
        Self { sink, channel }
    }

    /// Post one event of `commit` (the unit's representative commit).
    ///
    /// A transport error and a response without the success flag both come
    /// back as `Err`, after the raw diagnostics have been logged.
    pub fn dispatch(&self, commit: &CommitInfo, event: &Classification<'_>) -> Result<Dispatched> {
        let Some(message) = event.message(&commit.author.name) else {
            return Ok(Dispatched::Skipped);
        };

        let (method, result) = match event.patch() {
            Some(patch) if !patch.is_empty() => {
                let upload = PatchUpload::diff(message.as_str(), commit.summary.as_str(), patch);
                ("upload_patch", self.sink.upload_patch(self.channel, &upload))
            }
            // nothing to upload for an empty new page
            _ => ("post_message", self.sink.post_message(self.channel, &message)),
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                error!(channel = %self.channel.name, method, error = %e, "Notification failed");
                return Err(e);
            }
        };

        if !response.ok {
            error!(
                channel = %self.channel.name,
                method,
                payload = %response.payload,
                "Notification was not accepted"
            );
            return Err(Error::Sink {
                method: method.to_string(),
                payload: response.payload,
            });
        }

        info!(
            channel = %self.channel.name,
            commit = %commit.short_id(),
            committed_at = %commit.timestamp.to_rfc3339(),
            "{}",
            message
        );
        debug!(payload = %response.payload, "Sink response");

        Ok(Dispatched::Sent(response))
    }
}
