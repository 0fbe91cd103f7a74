//! Feed pagination.

use agora_common::{AppResult, FeedConfig};
use agora_feed::FeedReconciler;
use tracing::debug;

use crate::api::PollApiService;

/// Loads older pages of channel feeds into the reconciler.
#[derive(Clone)]
pub struct FeedLoader {
    api: PollApiService,
    reconciler: FeedReconciler,
    page_size: usize,
}

impl FeedLoader {
    /// Create a loader requesting `page_size` items per page.
    #[must_use]
    pub const fn new(api: PollApiService, reconciler: FeedReconciler, page_size: usize) -> Self {
        Self {
            api,
            reconciler,
            page_size,
        }
    }

    /// Create a loader from feed configuration.
    #[must_use]
    pub const fn from_config(
        api: PollApiService,
        reconciler: FeedReconciler,
        config: &FeedConfig,
    ) -> Self {
        Self::new(api, reconciler, config.page_size)
    }

    /// Fetch the next older page of a channel.
    ///
    /// Returns the number of new items, or `None` when the feed was already
    /// exhausted and nothing was requested.
    pub async fn load_next_page(&self, channel_id: &str) -> AppResult<Option<usize>> {
        let Some(offset) = self.reconciler.next_page_param(channel_id).await else {
            debug!(channel_id, "Feed exhausted");
            return Ok(None);
        };
        let items = self
            .api
            .get_channel_feed(channel_id, offset, self.page_size)
            .await?;
        let fetched = items.len();
        let added = self.reconciler.append_page(channel_id, items).await;
        debug!(channel_id, offset, fetched, added, "Loaded feed page");
        Ok(Some(added))
    }
}
