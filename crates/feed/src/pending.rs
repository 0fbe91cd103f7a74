//! Registry of in-flight mutations.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use agora_common::{AppError, AppResult};
use agora_core::models::{FeedItem, Fingerprint};

use crate::cache::FeedEntry;

/// What is needed to undo one in-flight mutation.
#[derive(Debug, Clone)]
pub enum PendingMutation {
    /// A speculative item inserted at the head of the newest page.
    Insert {
        /// Newest page as it was before the insert.
        snapshot: Vec<FeedEntry>,
        /// Newest page revision right after the insert.
        revision: u64,
    },
    /// A speculative edit of an existing item.
    Update {
        id: String,
        prior: FeedEntry,
        speculative: FeedItem,
    },
}

/// In-flight mutations keyed by fingerprint. At most one per fingerprint.
#[derive(Debug, Default)]
pub struct PendingRegistry {
    entries: BTreeMap<Fingerprint, PendingMutation>,
}

impl PendingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject `fingerprint` if a mutation with it is already in flight.
    pub fn ensure_absent(&self, fingerprint: &Fingerprint) -> AppResult<()> {
        if self.entries.contains_key(fingerprint) {
            return Err(AppError::DuplicateSubmission(fingerprint.to_string()));
        }
        Ok(())
    }

    /// Record a new in-flight mutation.
    pub fn register(&mut self, fingerprint: Fingerprint, mutation: PendingMutation) -> AppResult<()> {
        self.ensure_absent(&fingerprint)?;
        self.entries.insert(fingerprint, mutation);
        Ok(())
    }

    /// Clear and return the mutation for `fingerprint`.
    pub fn take(&mut self, fingerprint: &Fingerprint) -> Option<PendingMutation> {
        self.entries.remove(fingerprint)
    }

    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains_key(fingerprint)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fingerprints(&self) -> impl Iterator<Item = &Fingerprint> {
        self.entries.keys()
    }
}
