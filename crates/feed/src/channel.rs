//! The feed of one channel: cache plus in-flight mutations.
//!
//! `ChannelFeed` is synchronous; [`FeedReconciler`](crate::FeedReconciler)
//! serializes access to it per channel.

#![allow(missing_docs)]

use agora_common::{AppError, AppResult};
use agora_core::models::{FeedItem, FeedItemKey, Fingerprint, Image, MutationKey, Poll};
use agora_core::{PollStageMachine, StageEvent};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::cache::{FeedCache, FeedEntry};
use crate::pending::{PendingMutation, PendingRegistry};

/// Keep image sources the client already resolved when the incoming copy
/// has none.
fn preserve_image_src(existing: &[Image], incoming: &mut [Image]) {
    for image in incoming.iter_mut().filter(|image| image.src.is_none()) {
        if let Some(src) = existing
            .iter()
            .find(|old| old.id == image.id)
            .and_then(|old| old.src.clone())
        {
            image.src = Some(src);
        }
    }
}

/// Carry the local stage forward through the snapshot's stage, never back.
fn merge_poll(existing: &Poll, incoming: &mut Poll, user_id: &str) {
    let snapshot_stage = incoming.stage;
    incoming.stage = existing.stage;
    PollStageMachine::advance(incoming, StageEvent::Snapshot(snapshot_stage));
    incoming.derive_my_vote(user_id);
}

fn merge_item(existing: &FeedItem, incoming: FeedItem, user_id: &str) -> FeedItem {
    match (existing, incoming) {
        (FeedItem::Message(old), FeedItem::Message(mut new)) => {
            preserve_image_src(&old.images, &mut new.images);
            FeedItem::Message(new)
        }
        (FeedItem::Poll(old), FeedItem::Poll(mut new)) => {
            merge_poll(old, &mut new, user_id);
            FeedItem::Poll(new)
        }
        (_, incoming) => {
            warn!(id = incoming.id(), "Feed item changed type; taking incoming");
            incoming
        }
    }
}

fn prepare_new(mut item: FeedItem, user_id: &str) -> FeedItem {
    if let Some(poll) = item.as_poll_mut() {
        poll.derive_my_vote(user_id);
    }
    item
}

/// Cached feed of a single channel as seen by one user.
#[derive(Debug)]
pub struct ChannelFeed {
    channel_id: String,
    user_id: String,
    cache: FeedCache,
    pending: PendingRegistry,
}

impl ChannelFeed {
    #[must_use]
    pub fn new(channel_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            user_id: user_id.into(),
            cache: FeedCache::new(),
            pending: PendingRegistry::new(),
        }
    }

    #[must_use]
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    #[must_use]
    pub const fn cache(&self) -> &FeedCache {
        &self.cache
    }

    #[must_use]
    pub const fn pending(&self) -> &PendingRegistry {
        &self.pending
    }

    /// Items in feed order.
    #[must_use]
    pub fn items(&self) -> Vec<FeedItem> {
        self.cache.entries().map(|entry| entry.item.clone()).collect()
    }

    /// Committed entry with item id `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FeedEntry> {
        self.cache
            .position_of_id(id)
            .and_then(|pos| self.cache.get(pos))
    }

    /// Show `item` immediately under a pending key.
    pub fn optimistic_insert(
        &mut self,
        fingerprint: Fingerprint,
        item: FeedItem,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if !matches!(fingerprint.key, MutationKey::Insert { .. }) {
            return Err(AppError::Internal(format!(
                "Insert requires an insert fingerprint, got {fingerprint}"
            )));
        }
        self.pending.ensure_absent(&fingerprint)?;

        let (snapshot, _) = self.cache.head_snapshot();
        let key = FeedItemKey::Pending {
            fingerprint: fingerprint.clone(),
        };
        self.cache.insert_head(FeedEntry::new(key, item, now));
        let revision = self.cache.head_revision();

        debug!(%fingerprint, "Optimistic insert");
        self.pending
            .register(fingerprint, PendingMutation::Insert { snapshot, revision })
    }

    /// Replace a pending item with the server's version.
    ///
    /// An unknown fingerprint is merged like a pushed item.
    pub fn commit(&mut self, fingerprint: &Fingerprint, item: FeedItem, now: DateTime<Utc>) {
        match self.pending.take(fingerprint) {
            Some(PendingMutation::Insert { .. }) => {
                self.cache.remove(&FeedItemKey::Pending {
                    fingerprint: fingerprint.clone(),
                });
                debug!(%fingerprint, id = item.id(), "Committed insert");
            }
            Some(PendingMutation::Update { id, .. }) => {
                debug!(%fingerprint, %id, "Committed update with full item");
            }
            None => {
                warn!(%fingerprint, id = item.id(), "Commit for unknown mutation; merging as push");
            }
        }
        self.apply_pushed(item, now);
    }

    /// Undo an in-flight mutation. Returns whether one was found.
    pub fn rollback(&mut self, fingerprint: &Fingerprint) -> bool {
        match self.pending.take(fingerprint) {
            Some(PendingMutation::Insert { snapshot, revision }) => {
                if self.cache.head_revision() == revision {
                    self.cache.restore_head(snapshot);
                    debug!(%fingerprint, "Rolled back insert; newest page restored");
                } else {
                    self.cache.remove(&FeedItemKey::Pending {
                        fingerprint: fingerprint.clone(),
                    });
                    debug!(%fingerprint, "Rolled back insert; newest page changed since");
                }
                true
            }
            Some(PendingMutation::Update {
                id,
                prior,
                speculative,
            }) => {
                let restored = self.cache.position_of_id(&id).and_then(|pos| {
                    self.cache.update_at(pos, |entry| {
                        if entry.item == speculative {
                            *entry = prior;
                            true
                        } else {
                            false
                        }
                    })
                });
                if restored == Some(true) {
                    debug!(%fingerprint, %id, "Rolled back update");
                } else {
                    debug!(%fingerprint, %id, "Item changed since update; keeping it");
                }
                true
            }
            None => {
                warn!(%fingerprint, "Rollback for unknown mutation");
                false
            }
        }
    }

    /// Merge an authoritative item. Replaces in place when the id is cached,
    /// otherwise inserts at the head of the newest page.
    pub fn apply_pushed(&mut self, item: FeedItem, now: DateTime<Utc>) {
        let user_id = &self.user_id;
        if let Some(pos) = self.cache.position_of_id(item.id()) {
            self.cache.update_at(pos, |entry| {
                let merged = merge_item(&entry.item, item, user_id);
                entry.set_item(merged, now);
            });
            debug!(channel_id = %self.channel_id, "Replaced feed item in place");
        } else {
            let id = item.id().to_string();
            let item = prepare_new(item, user_id);
            self.cache.insert_head(FeedEntry::committed(item, now));
            debug!(channel_id = %self.channel_id, %id, "Inserted pushed feed item");
        }
    }

    /// Apply a speculative edit to an existing item.
    ///
    /// `edit` runs on a copy of the item; if it fails nothing is changed and
    /// nothing is registered.
    pub fn begin_update<T>(
        &mut self,
        fingerprint: Fingerprint,
        id: &str,
        now: DateTime<Utc>,
        edit: impl FnOnce(&mut FeedItem) -> AppResult<T>,
    ) -> AppResult<T> {
        self.pending.ensure_absent(&fingerprint)?;
        let prior = self
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Feed item {id}")))?;

        let mut speculative = prior.item.clone();
        let value = edit(&mut speculative)?;

        if let Some(pos) = self.cache.position_of_id(id) {
            let item = speculative.clone();
            self.cache.update_at(pos, |entry| entry.set_item(item, now));
        }
        debug!(%fingerprint, id, "Speculative update");
        self.pending.register(
            fingerprint,
            PendingMutation::Update {
                id: id.to_string(),
                prior,
                speculative,
            },
        )?;
        Ok(value)
    }

    /// Apply the server's result of an update to the item as it is now.
    ///
    /// `apply` runs against the current cached item, so pushes that landed
    /// while the request was in flight are kept. Returns whether an item
    /// was updated.
    pub fn commit_update(
        &mut self,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
        apply: impl FnOnce(&mut FeedItem),
    ) -> bool {
        let id = match self.pending.take(fingerprint) {
            Some(PendingMutation::Update { id, .. }) => id,
            Some(insert @ PendingMutation::Insert { .. }) => {
                warn!(%fingerprint, "Update commit for an insert; ignoring");
                if let Err(err) = self.pending.register(fingerprint.clone(), insert) {
                    err.log();
                }
                return false;
            }
            None => match &fingerprint.key {
                MutationKey::Vote { poll_id } => {
                    warn!(%fingerprint, "Update commit for unknown mutation; applying to current item");
                    poll_id.clone()
                }
                MutationKey::Insert { .. } => {
                    warn!(%fingerprint, "Update commit for unknown insert");
                    return false;
                }
            },
        };

        let Some(pos) = self.cache.position_of_id(&id) else {
            warn!(%fingerprint, %id, "Committed update for an item no longer cached");
            return false;
        };
        self.cache
            .update_at(pos, |entry| {
                let mut item = entry.item.clone();
                apply(&mut item);
                entry.set_item(item, now);
            })
            .is_some()
    }

    /// Update an image's placeholder flag in place.
    pub fn resolve_image(
        &mut self,
        message_id: &str,
        image_id: &str,
        is_placeholder: bool,
    ) -> bool {
        let Some(pos) = self.cache.position_of_id(message_id) else {
            return false;
        };
        self.cache
            .update_at(pos, |entry| {
                let Some(message) = entry.item.as_message_mut() else {
                    return false;
                };
                let Some(image) = message.images.iter_mut().find(|i| i.id == image_id) else {
                    return false;
                };
                image.is_placeholder = is_placeholder;
                true
            })
            .unwrap_or(false)
    }

    /// Append an older page fetched from the server.
    pub fn append_page(&mut self, items: Vec<FeedItem>, now: DateTime<Utc>) -> usize {
        let entries = items
            .into_iter()
            .map(|item| FeedEntry::committed(prepare_new(item, &self.user_id), now))
            .collect();
        let added = self.cache.append_page(entries);
        debug!(channel_id = %self.channel_id, added, exhausted = self.cache.is_exhausted(), "Appended page");
        added
    }

    #[must_use]
    pub fn next_page_param(&self) -> Option<usize> {
        self.cache.next_page_param()
    }
}
