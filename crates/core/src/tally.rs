//! Vote counting.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{PollOption, Vote, VoteChoice, VoteKind};
use crate::percent::share_percentage;

/// Option ids of `vote` that count towards the tally: known, deduplicated,
/// and only the first of them unless `multiple_choice` is on.
fn counted_selections<'a>(
    vote: &'a Vote,
    options: &[PollOption],
    multiple_choice: bool,
) -> Vec<&'a str> {
    let VoteChoice::Options(selected) = &vote.choice else {
        return Vec::new();
    };
    let limit = if multiple_choice { usize::MAX } else { 1 };
    let mut counted: Vec<&str> = Vec::new();
    for option_id in selected {
        if counted.len() == limit {
            break;
        }
        if options.iter().any(|o| &o.id == option_id) && !counted.contains(&option_id.as_str()) {
            counted.push(option_id);
        }
    }
    counted
}

/// Keep only the latest vote of each voter.
///
/// The server guarantees one active vote per voter; a snapshot that still
/// carries a superseded vote must not be counted twice.
fn latest_per_voter(votes: &[Vote]) -> Vec<&Vote> {
    let mut latest: BTreeMap<&str, &Vote> = BTreeMap::new();
    for vote in votes {
        latest
            .entry(vote.voter_id.as_str())
            .and_modify(|current| {
                if vote.created_at >= current.created_at {
                    *current = vote;
                }
            })
            .or_insert(vote);
    }
    latest.into_values().collect()
}

/// Counts per proposal vote kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub agree: u32,
    pub disagree: u32,
    pub abstain: u32,
    pub block: u32,
}

impl VoteTally {
    /// Tally the active votes of a proposal. Option votes are ignored.
    #[must_use]
    pub fn from_votes(votes: &[Vote]) -> Self {
        let mut tally = Self::default();
        for vote in latest_per_voter(votes) {
            if let VoteChoice::Kind(kind) = vote.choice {
                *tally.slot(kind) += 1;
            }
        }
        tally
    }

    fn slot(&mut self, kind: VoteKind) -> &mut u32 {
        match kind {
            VoteKind::Agree => &mut self.agree,
            VoteKind::Disagree => &mut self.disagree,
            VoteKind::Abstain => &mut self.abstain,
            VoteKind::Block => &mut self.block,
        }
    }

    /// Count for one vote kind.
    #[must_use]
    pub const fn count(&self, kind: VoteKind) -> u32 {
        match kind {
            VoteKind::Agree => self.agree,
            VoteKind::Disagree => self.disagree,
            VoteKind::Abstain => self.abstain,
            VoteKind::Block => self.block,
        }
    }

    /// All votes cast.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.agree + self.disagree + self.abstain + self.block
    }

    /// Votes that count toward ratification (agree + disagree).
    #[must_use]
    pub const fn participant_votes(&self) -> u32 {
        self.agree + self.disagree
    }
}

/// One row of a multi-option breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionShare {
    pub option_id: String,
    pub text: String,
    pub count: u32,
    pub percentage: u8,
}

/// Counts per option of a multi-option poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    /// Option id → number of voters selecting it.
    pub counts: BTreeMap<String, u32>,
    /// Distinct voters.
    pub voters: u32,
    /// Sum of all per-option counts.
    pub selections: u32,
    pub multiple_choice: bool,
}

impl OptionTally {
    /// Tally option votes.
    ///
    /// Unknown option ids and repeated ids within one vote are ignored. When
    /// `multiple_choice` is off only the first selection of a vote counts.
    #[must_use]
    pub fn from_votes(votes: &[Vote], options: &[PollOption], multiple_choice: bool) -> Self {
        let mut counts: BTreeMap<String, u32> =
            options.iter().map(|o| (o.id.clone(), 0)).collect();
        let mut voters = 0;

        for vote in latest_per_voter(votes) {
            let counted = counted_selections(vote, options, multiple_choice);
            for option_id in &counted {
                if let Some(count) = counts.get_mut(*option_id) {
                    *count += 1;
                }
            }
            if !counted.is_empty() {
                voters += 1;
            }
        }

        let selections = counts.values().sum();
        Self {
            counts,
            voters,
            selections,
            multiple_choice,
        }
    }

    /// Denominator for option percentages: total selections for
    /// multiple-choice polls, distinct voters otherwise.
    #[must_use]
    pub const fn denominator(&self) -> u32 {
        if self.multiple_choice {
            self.selections
        } else {
            self.voters
        }
    }

    #[must_use]
    pub fn count(&self, option_id: &str) -> u32 {
        self.counts.get(option_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn percentage(&self, option_id: &str) -> u8 {
        share_percentage(self.count(option_id), self.denominator())
    }

    /// Breakdown in option order.
    #[must_use]
    pub fn breakdown(&self, options: &[PollOption]) -> Vec<OptionShare> {
        options
            .iter()
            .map(|option| OptionShare {
                option_id: option.id.clone(),
                text: option.text.clone(),
                count: self.count(&option.id),
                percentage: self.percentage(&option.id),
            })
            .collect()
    }
}

/// Voters whose vote counts for a given option, under the same rules as
/// [`OptionTally::from_votes`].
#[must_use]
pub fn voters_for_option<'a>(
    votes: &'a [Vote],
    options: &[PollOption],
    multiple_choice: bool,
    option_id: &str,
) -> Vec<&'a str> {
    latest_per_voter(votes)
        .into_iter()
        .filter(|v| counted_selections(v, options, multiple_choice).contains(&option_id))
        .map(|v| v.voter_id.as_str())
        .collect()
}
