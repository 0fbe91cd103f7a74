//! Paginated feed cache.
//!
//! Pages are ordered newest first. Page 0 receives optimistic and pushed
//! inserts; older pages are appended by pagination. Every page is kept
//! sorted by `(created_at, key)` descending, and an item id appears at most
//! once across all pages.

#![allow(missing_docs)]

use std::cmp::Reverse;

use agora_core::models::{FeedItem, FeedItemKey};
use agora_core::PollProgress;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One cached item with its identity and derived poll state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    pub key: FeedItemKey,
    pub item: FeedItem,
    /// Present for polls; recomputed whenever the item changes.
    pub progress: Option<PollProgress>,
}

impl FeedEntry {
    #[must_use]
    pub fn new(key: FeedItemKey, item: FeedItem, now: DateTime<Utc>) -> Self {
        let progress = item.as_poll().map(|poll| PollProgress::compute(poll, now));
        Self {
            key,
            item,
            progress,
        }
    }

    /// Entry for an item known to the server.
    #[must_use]
    pub fn committed(item: FeedItem, now: DateTime<Utc>) -> Self {
        let key = FeedItemKey::Committed {
            id: item.id().to_string(),
        };
        Self::new(key, item, now)
    }

    /// Replace the item and refresh derived state.
    pub fn set_item(&mut self, item: FeedItem, now: DateTime<Utc>) {
        self.progress = item.as_poll().map(|poll| PollProgress::compute(poll, now));
        self.item = item;
    }

    /// Whether this entry holds the committed item `id`.
    #[must_use]
    pub fn is_committed(&self, id: &str) -> bool {
        self.key.committed_id() == Some(id)
    }

    fn sort_key(&self) -> Reverse<(DateTime<Utc>, &FeedItemKey)> {
        Reverse((self.item.created_at(), &self.key))
    }
}

/// One page of the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub entries: Vec<FeedEntry>,
    /// Bumped on every change to this page.
    #[serde(skip)]
    pub revision: u64,
}

impl FeedPage {
    fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Whether entries are in feed order.
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.entries
            .windows(2)
            .all(|w| w[0].sort_key() <= w[1].sort_key())
    }
}

/// Position of an entry: `(page, index)`.
pub type Position = (usize, usize);

/// The cached feed of one channel.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedCache {
    pages: Vec<FeedPage>,
    /// Offset each page was fetched at.
    page_params: Vec<usize>,
    exhausted: bool,
}

impl FeedCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pages(&self) -> &[FeedPage] {
        &self.pages
    }

    #[must_use]
    pub fn page_params(&self) -> &[usize] {
        &self.page_params
    }

    /// All entries in feed order.
    pub fn entries(&self) -> impl Iterator<Item = &FeedEntry> {
        self.pages.iter().flat_map(|page| page.entries.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.iter().map(|page| page.entries.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn find(&self, pred: impl Fn(&FeedEntry) -> bool) -> Option<Position> {
        self.pages.iter().enumerate().find_map(|(p, page)| {
            page.entries.iter().position(&pred).map(|i| (p, i))
        })
    }

    /// Position of the entry with `key`.
    #[must_use]
    pub fn position(&self, key: &FeedItemKey) -> Option<Position> {
        self.find(|entry| &entry.key == key)
    }

    /// Position of the committed entry with item id `id`.
    #[must_use]
    pub fn position_of_id(&self, id: &str) -> Option<Position> {
        self.find(|entry| entry.is_committed(id))
    }

    #[must_use]
    pub fn get(&self, (page, index): Position) -> Option<&FeedEntry> {
        self.pages.get(page)?.entries.get(index)
    }

    /// Mutate the entry at `pos` in place. The page is re-sorted afterwards.
    pub fn update_at<T>(
        &mut self,
        (page, index): Position,
        f: impl FnOnce(&mut FeedEntry) -> T,
    ) -> Option<T> {
        let page = self.pages.get_mut(page)?;
        let result = f(page.entries.get_mut(index)?);
        page.sort();
        page.touch();
        Some(result)
    }

    fn head_mut(&mut self) -> &mut FeedPage {
        if self.pages.is_empty() {
            self.pages.push(FeedPage::default());
            self.page_params.push(0);
        }
        &mut self.pages[0]
    }

    /// Insert at the head of the newest page and re-sort it.
    pub fn insert_head(&mut self, entry: FeedEntry) {
        let head = self.head_mut();
        head.entries.insert(0, entry);
        head.sort();
        head.touch();
    }

    /// Remove the entry with `key`.
    pub fn remove(&mut self, key: &FeedItemKey) -> Option<FeedEntry> {
        let (page, index) = self.position(key)?;
        let page = &mut self.pages[page];
        let entry = page.entries.remove(index);
        page.touch();
        Some(entry)
    }

    /// Entries and revision of the newest page.
    #[must_use]
    pub fn head_snapshot(&self) -> (Vec<FeedEntry>, u64) {
        self.pages
            .first()
            .map_or_else(|| (Vec::new(), 0), |head| (head.entries.clone(), head.revision))
    }

    #[must_use]
    pub fn head_revision(&self) -> u64 {
        self.pages.first().map_or(0, |head| head.revision)
    }

    /// Put back newest-page entries captured by [`Self::head_snapshot`].
    pub fn restore_head(&mut self, entries: Vec<FeedEntry>) {
        let head = self.head_mut();
        head.entries = entries;
        head.touch();
    }

    /// Append an older page. Entries whose id is already cached are skipped;
    /// an empty page marks the feed as exhausted. Returns the number of
    /// entries added.
    pub fn append_page(&mut self, entries: Vec<FeedEntry>) -> usize {
        if entries.is_empty() {
            self.exhausted = true;
            return 0;
        }
        let offset = self.len();
        let mut page = FeedPage::default();
        for entry in entries {
            let id = entry.item.id();
            let duplicate = self.entries().any(|e| e.item.id() == id)
                || page.entries.iter().any(|e| e.item.id() == id);
            if !duplicate {
                page.entries.push(entry);
            }
        }
        let added = page.entries.len();
        page.sort();
        page.touch();
        self.pages.push(page);
        self.page_params.push(offset);
        added
    }

    /// Offset for the next page request, or `None` once exhausted.
    #[must_use]
    pub fn next_page_param(&self) -> Option<usize> {
        if self.exhausted {
            None
        } else {
            Some(self.len())
        }
    }
}
