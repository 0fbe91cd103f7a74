//! Shared data model.

#![allow(missing_docs)]

pub mod feed;
pub mod poll;
pub mod vote;

use serde::{Deserialize, Serialize};

pub use feed::{FeedItem, FeedItemKey, Fingerprint, Image, Message, MutationKey};
pub use poll::{DecisionMakingModel, Poll, PollAction, PollConfig, PollKind, PollOption, PollStage};
pub use vote::{MyVote, Vote, VoteChoice, VoteKind};

/// Who the client is acting as. Passed explicitly to everything that
/// needs the current user rather than read from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub user_id: String,
}

impl SessionContext {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}
