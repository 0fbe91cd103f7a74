//! Poll model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::vote::{MyVote, Vote};
use crate::role_diff::RoleChangeSet;

/// Lifecycle stage of a poll.
///
/// `Ratified` and `Closed` are terminal. Stage changes only go through
/// [`PollStageMachine`](crate::stage::PollStageMachine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStage {
    Open,
    Ratified,
    Closed,
}

impl PollStage {
    /// Whether no transition can leave this stage.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ratified | Self::Closed)
    }
}

/// Whether a poll is a four-way proposal or a multi-option poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollKind {
    Proposal,
    Poll,
}

/// Rule the server applies to decide ratification at close.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionMakingModel {
    #[default]
    Consensus,
    Consent,
    MajorityVote,
}

/// Poll configuration. Immutable after the poll is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollConfig {
    pub decision_making_model: DecisionMakingModel,
    pub quorum_enabled: bool,
    /// Percentage of members that must vote (0-100).
    pub quorum_threshold: u8,
    /// Percentage of agree among agree + disagree required (0-100).
    pub ratification_threshold: u8,
    pub closing_at: Option<DateTime<Utc>>,
    pub multiple_choice: bool,
    pub disagreements_limit: Option<u32>,
    pub abstains_limit: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            decision_making_model: DecisionMakingModel::Consensus,
            quorum_enabled: true,
            quorum_threshold: 25,
            ratification_threshold: 51,
            closing_at: None,
            multiple_choice: false,
            disagreements_limit: Some(2),
            abstains_limit: Some(2),
        }
    }
}

/// An option of a multi-option poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    pub id: String,
    pub text: String,
}

/// What a proposal does once ratified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "actionType", rename_all = "kebab-case")]
pub enum PollAction {
    General,
    #[serde(rename_all = "camelCase")]
    ChangeRole {
        role_id: String,
        changes: RoleChangeSet,
    },
    CreateRole {
        changes: RoleChangeSet,
    },
}

/// A poll or proposal posted to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: String,
    pub channel_id: String,
    pub body: String,
    pub creator_id: String,
    pub created_at: DateTime<Utc>,
    pub kind: PollKind,
    #[serde(default)]
    pub config: PollConfig,
    #[serde(default)]
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub votes: Vec<Vote>,
    pub stage: PollStage,
    pub member_count_at_creation: u32,
    #[serde(default)]
    pub my_vote: Option<MyVote>,
    #[serde(default)]
    pub action: Option<PollAction>,
}

impl Poll {
    /// Returns the active vote of a voter, if any.
    #[must_use]
    pub fn vote_of(&self, voter_id: &str) -> Option<&Vote> {
        self.votes.iter().find(|v| v.voter_id == voter_id)
    }

    /// Record a vote, replacing any earlier vote by the same voter in place.
    /// A vote from a new voter is appended.
    pub fn upsert_vote(&mut self, vote: Vote) {
        let same = |v: &Vote| v.voter_id == vote.voter_id || v.id == vote.id;
        match self.votes.iter().position(same) {
            Some(index) => {
                let mut i = 0;
                self.votes.retain(|v| {
                    let keep = i <= index || !same(v);
                    i += 1;
                    keep
                });
                self.votes[index] = vote;
            }
            None => self.votes.push(vote),
        }
    }

    /// Remove a voter's vote. Returns whether a vote was removed.
    pub fn remove_vote_of(&mut self, voter_id: &str) -> bool {
        let before = self.votes.len();
        self.votes.retain(|v| v.voter_id != voter_id);
        self.votes.len() != before
    }

    /// Fill `my_vote` from the vote list when the snapshot did not carry it.
    pub fn derive_my_vote(&mut self, user_id: &str) {
        if self.my_vote.is_none() {
            self.my_vote = self.vote_of(user_id).map(MyVote::from);
        }
    }

    /// Returns whether an option id belongs to this poll.
    #[must_use]
    pub fn has_option(&self, option_id: &str) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }
}
