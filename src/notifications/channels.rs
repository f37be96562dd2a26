//! Channel lookup by name

use std::collections::HashMap;
use tracing::error;

use crate::error::{Error, Result};

use super::{Channel, NotificationSink};

/// Channels visible to the bot at startup, keyed by name
#[derive(Debug, Clone, Default)]
pub struct ChannelDirectory {
    channels: HashMap<String, Channel>,
}

impl ChannelDirectory {
    pub fn load<S: NotificationSink>(sink: &S) -> Result<Self> {
        Ok(Self::from_channels(sink.list_channels()?))
    }

    pub fn from_channels(channels: impl IntoIterator<Item = Channel>) -> Self {
        Self {
            channels: channels.into_iter().map(|c| (c.name.clone(), c)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Channel> {
        self.get(name)
            .ok_or_else(|| Error::ChannelNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Look the channel up and ask the sink whether it is archived right now
    pub fn ensure_active<S: NotificationSink>(&self, sink: &S, name: &str) -> Result<&Channel> {
        let channel = self.require(name)?;
        if sink.is_archived(channel)? {
            error!(channel = %name, id = %channel.id, "Channel has been archived");
            return Err(Error::ChannelArchived(name.to_string()));
        }
        Ok(channel)
    }
}
