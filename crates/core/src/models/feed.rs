//! Channel feed items and the identity keys used to reconcile them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::poll::Poll;

/// Image attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub is_placeholder: bool,
}

/// A channel message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    pub created_at: DateTime<Utc>,
}

/// An item of a channel feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedItem {
    Message(Message),
    Poll(Poll),
}

impl FeedItem {
    /// Item id (a temporary id for pending items).
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Message(m) => &m.id,
            Self::Poll(p) => &p.id,
        }
    }

    /// Creation time used for feed ordering.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Message(m) => m.created_at,
            Self::Poll(p) => p.created_at,
        }
    }

    /// Channel the item belongs to.
    #[must_use]
    pub fn channel_id(&self) -> &str {
        match self {
            Self::Message(m) => &m.channel_id,
            Self::Poll(p) => &p.channel_id,
        }
    }

    #[must_use]
    pub const fn as_poll(&self) -> Option<&Poll> {
        match self {
            Self::Poll(p) => Some(p),
            Self::Message(_) => None,
        }
    }

    pub fn as_poll_mut(&mut self) -> Option<&mut Poll> {
        match self {
            Self::Poll(p) => Some(p),
            Self::Message(_) => None,
        }
    }

    pub fn as_message_mut(&mut self) -> Option<&mut Message> {
        match self {
            Self::Message(m) => Some(m),
            Self::Poll(_) => None,
        }
    }
}

/// What an in-flight mutation targets within a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MutationKey {
    /// Optimistic insert of a new item under a client-generated id.
    #[serde(rename_all = "camelCase")]
    Insert { temp_id: String },
    /// Vote cast on an existing poll.
    #[serde(rename_all = "camelCase")]
    Vote { poll_id: String },
}

/// Deterministic key of one in-flight mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub channel_id: String,
    pub key: MutationKey,
}

impl Fingerprint {
    /// Fingerprint of an optimistic insert.
    #[must_use]
    pub fn insert(channel_id: impl Into<String>, temp_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            key: MutationKey::Insert {
                temp_id: temp_id.into(),
            },
        }
    }

    /// Fingerprint of a vote on a poll. One per poll, so a second vote
    /// submission is rejected while the first is in flight.
    #[must_use]
    pub fn vote(channel_id: impl Into<String>, poll_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            key: MutationKey::Vote {
                poll_id: poll_id.into(),
            },
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            MutationKey::Insert { temp_id } => write!(f, "{}/insert/{}", self.channel_id, temp_id),
            MutationKey::Vote { poll_id } => write!(f, "{}/vote/{}", self.channel_id, poll_id),
        }
    }
}

/// Identity of a cached feed item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum FeedItemKey {
    /// Speculative item awaiting the server.
    Pending { fingerprint: Fingerprint },
    /// Item known to the server under this id.
    Committed { id: String },
}

impl FeedItemKey {
    /// The authoritative id, if committed.
    #[must_use]
    pub fn committed_id(&self) -> Option<&str> {
        match self {
            Self::Committed { id } => Some(id),
            Self::Pending { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feed_item_tagging() {
        let item: FeedItem = serde_json::from_value(json!({
            "type": "message",
            "id": "m1",
            "channelId": "c1",
            "body": "hello",
            "images": [{ "id": "i1", "isPlaceholder": true }],
            "createdAt": "2025-01-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(item.id(), "m1");
        assert_eq!(item.channel_id(), "c1");
        assert!(item.as_poll().is_none());
    }

    #[test]
    fn test_fingerprint_display() {
        assert_eq!(Fingerprint::insert("c1", "t1").to_string(), "c1/insert/t1");
        assert_eq!(Fingerprint::vote("c1", "p1").to_string(), "c1/vote/p1");
        assert_ne!(Fingerprint::vote("c1", "p1"), Fingerprint::vote("c2", "p1"));
    }

    #[test]
    fn test_key_committed_id() {
        let key = FeedItemKey::Committed { id: "p1".to_string() };
        assert_eq!(key.committed_id(), Some("p1"));
        let pending = FeedItemKey::Pending {
            fingerprint: Fingerprint::insert("c1", "t1"),
        };
        assert!(pending.is_pending());
        assert_eq!(pending.committed_id(), None);
    }
}
