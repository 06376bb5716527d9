//! In-process change feed for the `templates` table
//!
//! Subscribers receive every committed write. The feed has no link to the
//! cache: a subscriber that wants fresh data still reads through the store.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::supabase::TEMPLATES_TABLE;
use crate::templates::Template;

const DEFAULT_CAPACITY: usize = 256;

/// Kind of row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeEvent {
    Insert,
    Update,
    Delete,
}

/// A committed change to one template row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateChange {
    pub event: ChangeEvent,
    pub table: String,
    /// Row after the change; absent for deletes
    pub record: Option<Template>,
    /// Id of the removed row
    pub old_id: Option<String>,
}

impl TemplateChange {
    pub fn upserted(event: ChangeEvent, record: Template) -> Self {
        Self {
            event,
            table: TEMPLATES_TABLE.to_string(),
            record: Some(record),
            old_id: None,
        }
    }

    pub fn deleted(id: impl Into<String>) -> Self {
        Self {
            event: ChangeEvent::Delete,
            table: TEMPLATES_TABLE.to_string(),
            record: None,
            old_id: Some(id.into()),
        }
    }
}

/// Broadcast hub for template changes
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<TemplateChange>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Deliver a change to all current subscribers, returning how many saw it
    pub fn publish(&self, change: TemplateChange) -> usize {
        match self.sender.send(change) {
            Ok(n) => n,
            // No subscribers
            Err(_) => 0,
        }
    }

    /// Subscribe to every change event
    pub fn subscribe(&self, channel: impl Into<String>) -> Subscription {
        self.subscribe_filtered(channel, None)
    }

    /// Subscribe to one kind of change, or all when `event` is `None`
    pub fn subscribe_filtered(&self, channel: impl Into<String>, event: Option<ChangeEvent>) -> Subscription {
        let channel = channel.into();
        debug!("Subscribed to channel: {}", channel);
        Subscription {
            channel,
            filter: event,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A live subscription; dropping it unsubscribes
pub struct Subscription {
    channel: String,
    filter: Option<ChangeEvent>,
    receiver: broadcast::Receiver<TemplateChange>,
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Wait for the next matching change; `None` once the feed is gone
    pub async fn next(&mut self) -> Option<TemplateChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if self.matches(&change) => return Some(change),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Subscriber on {} lagged, skipped {} changes", self.channel, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Return a pending matching change without waiting
    pub fn try_next(&mut self) -> Option<TemplateChange> {
        loop {
            match self.receiver.try_recv() {
                Ok(change) if self.matches(&change) => return Some(change),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Subscriber on {} lagged, skipped {} changes", self.channel, skipped);
                }
                Err(_) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}

    fn matches(&self, change: &TemplateChange) -> bool {
        self.filter.map_or(true, |event| event == change.event)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!("Unsubscribed from channel: {}", self.channel);
    }
}
