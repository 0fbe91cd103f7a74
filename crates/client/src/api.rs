//! Poll API abstraction.
//!
//! The HTTP client that talks to the server lives outside this crate; the
//! services here only see this trait.

use std::sync::Arc;

use agora_common::AppResult;
use agora_core::models::{FeedItem, Poll, Vote, VoteChoice};
use agora_core::CreatePollInput;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Server response to a created or updated vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    /// The vote as recorded by the server.
    pub vote: Vote,
    /// Whether this vote ratified the poll.
    pub is_ratifying_vote: bool,
}

/// A member who selected a poll option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voter {
    /// User id.
    pub id: String,
    /// Display name, when the server sends one.
    #[serde(default)]
    pub name: Option<String>,
}

/// Poll and vote operations of the server.
#[async_trait]
pub trait PollApi: Send + Sync {
    /// Cast a first vote on a poll.
    async fn create_vote(
        &self,
        channel_id: &str,
        poll_id: &str,
        choice: &VoteChoice,
    ) -> AppResult<VoteReceipt>;

    /// Change an existing vote.
    async fn update_vote(
        &self,
        channel_id: &str,
        poll_id: &str,
        vote_id: &str,
        choice: &VoteChoice,
    ) -> AppResult<VoteReceipt>;

    /// Withdraw a vote.
    async fn delete_vote(&self, channel_id: &str, poll_id: &str, vote_id: &str) -> AppResult<()>;

    /// Create a poll or proposal.
    async fn create_poll(&self, input: &CreatePollInput) -> AppResult<Poll>;

    /// Members who selected `option_id`.
    async fn get_voters_by_poll_option(
        &self,
        channel_id: &str,
        poll_id: &str,
        option_id: &str,
    ) -> AppResult<Vec<Voter>>;

    /// One page of a channel feed, newest first.
    async fn get_channel_feed(
        &self,
        channel_id: &str,
        offset: usize,
        limit: usize,
    ) -> AppResult<Vec<FeedItem>>;
}

/// Wrapper for boxed `PollApi` trait object.
pub type PollApiService = Arc<dyn PollApi>;
