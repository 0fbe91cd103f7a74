//! Ratification threshold evaluation.

#![allow(missing_docs)]

use serde::Serialize;

use crate::percent::{progress_percentage, required_count};
use crate::tally::VoteTally;

/// Progress of agree votes toward the ratification threshold.
///
/// Only agree and disagree votes participate; abstain and block are
/// excluded from the denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatificationProgress {
    pub agree: u32,
    pub participant_votes: u32,
    pub required: u32,
    pub threshold: u8,
    pub percentage: u8,
    pub met: bool,
}

/// Evaluate a tally against a ratification threshold.
///
/// ```
/// use agora_core::ratification::evaluate_ratification;
/// use agora_core::tally::VoteTally;
///
/// let tally = VoteTally { agree: 2, disagree: 1, ..VoteTally::default() };
/// let progress = evaluate_ratification(&tally, 60);
/// assert_eq!(progress.participant_votes, 3);
/// assert_eq!(progress.required, 2);
/// assert!(progress.met);
/// ```
#[must_use]
pub const fn evaluate_ratification(tally: &VoteTally, threshold: u8) -> RatificationProgress {
    let participant_votes = tally.participant_votes();
    let required = required_count(participant_votes, threshold);
    RatificationProgress {
        agree: tally.agree,
        participant_votes,
        required,
        threshold,
        percentage: progress_percentage(tally.agree, required),
        met: participant_votes > 0 && tally.agree >= required,
    }
}
