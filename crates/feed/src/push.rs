//! Push notifications for a channel subscription.
//!
//! Frames arrive as JSON envelopes `{ "type": ..., "payload": ... }` and are
//! merged into the [`FeedReconciler`] as authoritative state.

#![allow(missing_docs)]

use std::fmt;

use agora_common::AppResult;
use agora_core::models::{FeedItem, Message, Poll};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::reconciler::FeedReconciler;

/// Subscription a push stream is opened for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionKey {
    pub channel_id: String,
    pub user_id: String,
}

impl SubscriptionKey {
    #[must_use]
    pub fn new(channel_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            user_id: user_id.into(),
        }
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel:{}:user:{}", self.channel_id, self.user_id)
    }
}

/// An image finished (or restarted) processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePush {
    pub message_id: String,
    pub image_id: String,
    pub is_placeholder: bool,
}

/// One push frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum PushEnvelope {
    /// A message was created or edited.
    Message(Message),
    /// A poll was created or its votes or stage changed.
    Poll(Poll),
    /// An image placeholder changed.
    Image(ImagePush),
}

impl PushEnvelope {
    /// Channel the frame belongs to, when the payload names one.
    #[must_use]
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::Message(message) => Some(&message.channel_id),
            Self::Poll(poll) => Some(&poll.channel_id),
            Self::Image(_) => None,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Poll(_) => "poll",
            Self::Image(_) => "image",
        }
    }
}

/// Decode one JSON frame.
pub fn decode_envelope(frame: &str) -> AppResult<PushEnvelope> {
    Ok(serde_json::from_str(frame)?)
}

/// Frame counters of one [`PushDispatcher::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchStats {
    /// Frames merged into the feed.
    pub applied: usize,
    /// Frames that could not be decoded or did not belong to the subscription.
    pub skipped: usize,
}

/// Feeds the push stream of one subscription into the reconciler.
pub struct PushDispatcher {
    reconciler: FeedReconciler,
    key: SubscriptionKey,
}

impl PushDispatcher {
    #[must_use]
    pub const fn new(reconciler: FeedReconciler, key: SubscriptionKey) -> Self {
        Self { reconciler, key }
    }

    #[must_use]
    pub const fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    /// Merge one decoded frame. Returns whether it was applied.
    pub async fn handle(&self, envelope: PushEnvelope) -> bool {
        if envelope
            .channel_id()
            .is_some_and(|channel_id| channel_id != self.key.channel_id)
        {
            warn!(
                subscription = %self.key,
                channel_id = envelope.channel_id(),
                kind = envelope.kind(),
                "Push frame for another channel; skipping"
            );
            return false;
        }

        match envelope {
            PushEnvelope::Message(message) => {
                debug!(subscription = %self.key, id = %message.id, "Pushed message");
                self.reconciler.apply_pushed(FeedItem::Message(message)).await;
                true
            }
            PushEnvelope::Poll(poll) => {
                debug!(subscription = %self.key, id = %poll.id, stage = ?poll.stage, "Pushed poll");
                self.reconciler.apply_pushed(FeedItem::Poll(poll)).await;
                true
            }
            PushEnvelope::Image(image) => {
                let resolved = self
                    .reconciler
                    .resolve_image(
                        &self.key.channel_id,
                        &image.message_id,
                        &image.image_id,
                        image.is_placeholder,
                    )
                    .await;
                if !resolved {
                    warn!(
                        subscription = %self.key,
                        message_id = %image.message_id,
                        image_id = %image.image_id,
                        "Pushed image for an uncached message"
                    );
                }
                resolved
            }
        }
    }

    /// Consume raw frames until the stream ends.
    pub async fn run<S>(&self, mut frames: S) -> DispatchStats
    where
        S: Stream<Item = String> + Unpin,
    {
        let mut stats = DispatchStats::default();
        while let Some(frame) = frames.next().await {
            match decode_envelope(&frame) {
                Ok(envelope) => {
                    if self.handle(envelope).await {
                        stats.applied += 1;
                    } else {
                        stats.skipped += 1;
                    }
                }
                Err(e) => {
                    warn!(subscription = %self.key, "Failed to decode push frame: {}", e);
                    stats.skipped += 1;
                }
            }
        }
        debug!(subscription = %self.key, applied = stats.applied, skipped = stats.skipped, "Push stream ended");
        stats
    }
}
