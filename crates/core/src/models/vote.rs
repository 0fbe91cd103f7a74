//! Vote model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of vote cast on a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoteKind {
    Agree,
    Disagree,
    Abstain,
    Block,
}

impl VoteKind {
    /// All vote kinds, in display order.
    pub const ALL: [Self; 4] = [Self::Agree, Self::Disagree, Self::Abstain, Self::Block];
}

/// What a vote selects: a proposal vote kind or a set of poll options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    #[serde(rename = "voteType")]
    Kind(VoteKind),
    #[serde(rename = "pollOptionIds")]
    Options(Vec<String>),
}

impl VoteChoice {
    /// Returns the vote kind for proposal votes.
    #[must_use]
    pub const fn kind(&self) -> Option<VoteKind> {
        match self {
            Self::Kind(kind) => Some(*kind),
            Self::Options(_) => None,
        }
    }

    /// Returns the selected option ids for option votes.
    #[must_use]
    pub fn option_ids(&self) -> &[String] {
        match self {
            Self::Kind(_) => &[],
            Self::Options(ids) => ids,
        }
    }

    /// Whether two choices select the same thing, ignoring option order.
    #[must_use]
    pub fn same_selection(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Kind(a), Self::Kind(b)) => a == b,
            (Self::Options(a), Self::Options(b)) => {
                let mut a = a.clone();
                let mut b = b.clone();
                a.sort();
                a.dedup();
                b.sort();
                b.dedup();
                a == b
            }
            _ => false,
        }
    }
}

/// A single active vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: String,
    pub poll_id: String,
    pub voter_id: String,
    #[serde(flatten)]
    pub choice: VoteChoice,
    pub created_at: DateTime<Utc>,
}

/// The current user's own vote on a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyVote {
    pub id: String,
    #[serde(flatten)]
    pub choice: VoteChoice,
}

impl From<&Vote> for MyVote {
    fn from(vote: &Vote) -> Self {
        Self {
            id: vote.id.clone(),
            choice: vote.choice.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vote_wire_format() {
        let vote: Vote = serde_json::from_value(json!({
            "id": "v1",
            "pollId": "p1",
            "voterId": "u1",
            "voteType": "agree",
            "createdAt": "2025-01-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(vote.choice, VoteChoice::Kind(VoteKind::Agree));

        let vote: Vote = serde_json::from_value(json!({
            "id": "v2",
            "pollId": "p1",
            "voterId": "u1",
            "pollOptionIds": ["o1", "o2"],
            "createdAt": "2025-01-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(vote.choice.option_ids().len(), 2);
    }

    #[test]
    fn test_same_selection_ignores_order() {
        let a = VoteChoice::Options(vec!["o2".to_string(), "o1".to_string()]);
        let b = VoteChoice::Options(vec!["o1".to_string(), "o2".to_string()]);
        assert!(a.same_selection(&b));
        assert!(!a.same_selection(&VoteChoice::Kind(VoteKind::Agree)));
    }
}
