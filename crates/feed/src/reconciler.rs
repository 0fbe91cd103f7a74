//! Feed reconciler.
//!
//! Owns the feed of every channel the session has seen and is the only
//! writer of those feeds. Each channel is guarded by its own mutex so
//! mutations on one channel never wait on another, and every operation on
//! a channel is applied atomically.

use std::collections::HashMap;
use std::sync::Arc;

use agora_common::AppResult;
use agora_core::models::{FeedItem, Fingerprint, SessionContext};
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use crate::cache::FeedEntry;
use crate::channel::ChannelFeed;

/// Shared handle to the per-channel feeds.
#[derive(Clone)]
pub struct FeedReconciler {
    session: SessionContext,
    channels: Arc<RwLock<HashMap<String, Arc<Mutex<ChannelFeed>>>>>,
}

impl FeedReconciler {
    /// Create a reconciler for the given session.
    #[must_use]
    pub fn new(session: SessionContext) -> Self {
        Self {
            session,
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Session the feeds are kept for.
    #[must_use]
    pub const fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Feed of `channel_id`, created empty on first use.
    pub async fn channel(&self, channel_id: &str) -> Arc<Mutex<ChannelFeed>> {
        if let Some(feed) = self.channels.read().await.get(channel_id) {
            return Arc::clone(feed);
        }
        let mut channels = self.channels.write().await;
        Arc::clone(channels.entry(channel_id.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(ChannelFeed::new(
                channel_id,
                self.session.user_id.clone(),
            )))
        }))
    }

    /// Feed of `channel_id` if it has been created.
    pub async fn lookup(&self, channel_id: &str) -> Option<Arc<Mutex<ChannelFeed>>> {
        self.channels.read().await.get(channel_id).map(Arc::clone)
    }

    /// Ids of every channel with a feed.
    pub async fn channel_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.channels.read().await.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Show a speculative item until the server answers.
    pub async fn optimistic_insert(&self, fingerprint: Fingerprint, item: FeedItem) -> AppResult<()> {
        let feed = self.channel(&fingerprint.channel_id).await;
        let mut feed = feed.lock().await;
        feed.optimistic_insert(fingerprint, item, Utc::now())
    }

    /// Replace a speculative item with the server's version.
    pub async fn commit(&self, fingerprint: &Fingerprint, item: FeedItem) {
        let feed = self.channel(&fingerprint.channel_id).await;
        feed.lock().await.commit(fingerprint, item, Utc::now());
    }

    /// Undo an in-flight mutation.
    pub async fn rollback(&self, fingerprint: &Fingerprint) -> bool {
        let feed = self.channel(&fingerprint.channel_id).await;
        feed.lock().await.rollback(fingerprint)
    }

    /// Merge an authoritative item from a push or a refetch.
    pub async fn apply_pushed(&self, item: FeedItem) {
        let feed = self.channel(item.channel_id()).await;
        feed.lock().await.apply_pushed(item, Utc::now());
    }

    /// Speculatively edit an existing item. See [`ChannelFeed::begin_update`].
    pub async fn begin_update<T>(
        &self,
        fingerprint: Fingerprint,
        id: &str,
        edit: impl FnOnce(&mut FeedItem) -> AppResult<T>,
    ) -> AppResult<T> {
        let feed = self.channel(&fingerprint.channel_id).await;
        let mut feed = feed.lock().await;
        feed.begin_update(fingerprint, id, Utc::now(), edit)
    }

    /// Apply the server's result of an update. See [`ChannelFeed::commit_update`].
    pub async fn commit_update(
        &self,
        fingerprint: &Fingerprint,
        apply: impl FnOnce(&mut FeedItem),
    ) -> bool {
        let feed = self.channel(&fingerprint.channel_id).await;
        feed.lock().await.commit_update(fingerprint, Utc::now(), apply)
    }

    /// Flip an image's placeholder flag.
    pub async fn resolve_image(
        &self,
        channel_id: &str,
        message_id: &str,
        image_id: &str,
        is_placeholder: bool,
    ) -> bool {
        let Some(feed) = self.lookup(channel_id).await else {
            return false;
        };
        feed.lock()
            .await
            .resolve_image(message_id, image_id, is_placeholder)
    }

    /// Append an older page.
    pub async fn append_page(&self, channel_id: &str, items: Vec<FeedItem>) -> usize {
        let feed = self.channel(channel_id).await;
        feed.lock().await.append_page(items, Utc::now())
    }

    /// Offset of the next page, or `None` once the feed is exhausted.
    /// A channel never loaded starts at offset 0.
    pub async fn next_page_param(&self, channel_id: &str) -> Option<usize> {
        match self.lookup(channel_id).await {
            Some(feed) => feed.lock().await.next_page_param(),
            None => Some(0),
        }
    }

    /// Items of a channel in feed order.
    pub async fn items(&self, channel_id: &str) -> Vec<FeedItem> {
        match self.lookup(channel_id).await {
            Some(feed) => feed.lock().await.items(),
            None => Vec::new(),
        }
    }

    /// Committed entry `id` of a channel.
    pub async fn get(&self, channel_id: &str, id: &str) -> Option<FeedEntry> {
        let feed = self.lookup(channel_id).await?;
        feed.lock().await.get(id).cloned()
    }

    /// Number of in-flight mutations on a channel.
    pub async fn pending_count(&self, channel_id: &str) -> usize {
        match self.lookup(channel_id).await {
            Some(feed) => feed.lock().await.pending().len(),
            None => 0,
        }
    }
}
