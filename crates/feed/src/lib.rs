//! Channel feed reconciliation for agora.
//!
//! Keeps one ordered, de-duplicated feed per channel and merges three
//! sources of change into it:
//!
//! - optimistic local mutations, registered under a [`Fingerprint`] until
//!   the server answers
//! - authoritative responses, which commit or roll back those mutations
//! - pushed notifications from the [`PushDispatcher`]
//!
//! [`Fingerprint`]: agora_core::models::Fingerprint

pub mod cache;
pub mod channel;
pub mod pending;
pub mod push;
pub mod reconciler;

pub use cache::{FeedCache, FeedEntry, FeedPage};
pub use channel::ChannelFeed;
pub use pending::{PendingMutation, PendingRegistry};
pub use push::{DispatchStats, ImagePush, PushDispatcher, PushEnvelope, SubscriptionKey, decode_envelope};
pub use reconciler::FeedReconciler;
