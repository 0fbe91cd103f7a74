//! Derived display state of a poll.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::decision::{AutoCloseLimit, exceeded_limits, is_ratifiable};
use crate::models::{Poll, PollKind};
use crate::quorum::{Quorum, evaluate_quorum};
use crate::ratification::{RatificationProgress, evaluate_ratification};
use crate::tally::{OptionShare, OptionTally, VoteTally};

/// Everything a client shows about a poll's voting progress.
///
/// Recomputed from the poll after every merge; never edited directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollProgress {
    pub tally: VoteTally,
    /// Number of distinct voters, any kind.
    pub total_votes: u32,
    pub quorum: Quorum,
    pub ratification: RatificationProgress,
    /// Option breakdown for multi-option polls.
    pub options: Option<Vec<OptionShare>>,
    pub exceeded_limits: Vec<AutoCloseLimit>,
    /// Whether the poll would ratify if it closed at the time of computation.
    pub ratifiable: bool,
}

impl PollProgress {
    /// Compute progress for `poll` as of `now`.
    #[must_use]
    pub fn compute(poll: &Poll, now: DateTime<Utc>) -> Self {
        let tally = VoteTally::from_votes(&poll.votes);
        let option_tally = match poll.kind {
            PollKind::Poll => Some(OptionTally::from_votes(
                &poll.votes,
                &poll.options,
                poll.config.multiple_choice,
            )),
            PollKind::Proposal => None,
        };
        let total_votes = option_tally.as_ref().map_or(tally.total(), |o| o.voters);

        Self {
            tally,
            total_votes,
            quorum: evaluate_quorum(total_votes, poll.member_count_at_creation, &poll.config),
            ratification: evaluate_ratification(&tally, poll.config.ratification_threshold),
            options: option_tally.map(|o| o.breakdown(&poll.options)),
            exceeded_limits: exceeded_limits(&tally, &poll.config),
            ratifiable: is_ratifiable(&tally, poll.member_count_at_creation, &poll.config, now),
        }
    }
}
