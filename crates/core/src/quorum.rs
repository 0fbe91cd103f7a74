//! Quorum evaluation.

#![allow(missing_docs)]

use serde::Serialize;

use crate::models::PollConfig;
use crate::percent::{progress_percentage, required_count};

/// Progress toward an enabled quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuorumProgress {
    /// Votes cast so far (all kinds).
    pub current: u32,
    /// Votes needed for quorum.
    pub required: u32,
    pub threshold: u8,
    pub percentage: u8,
    pub met: bool,
}

/// Quorum state of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Quorum {
    /// Quorum is not enforced. Vacuously met and not displayed.
    Disabled,
    Enabled(QuorumProgress),
}

impl Quorum {
    #[must_use]
    pub const fn is_met(&self) -> bool {
        match self {
            Self::Disabled => true,
            Self::Enabled(progress) => progress.met,
        }
    }

    /// Whether quorum progress should be shown at all.
    #[must_use]
    pub const fn is_displayed(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }

    #[must_use]
    pub const fn progress(&self) -> Option<&QuorumProgress> {
        match self {
            Self::Disabled => None,
            Self::Enabled(progress) => Some(progress),
        }
    }
}

/// Evaluate quorum for `total_votes` out of `member_count` members.
///
/// ```
/// use agora_core::models::PollConfig;
/// use agora_core::quorum::evaluate_quorum;
///
/// let config = PollConfig { quorum_threshold: 40, ..PollConfig::default() };
/// let quorum = evaluate_quorum(1, 5, &config);
/// let progress = quorum.progress().unwrap();
/// assert_eq!(progress.required, 2);
/// assert_eq!(progress.percentage, 50);
/// assert!(!quorum.is_met());
/// ```
#[must_use]
pub const fn evaluate_quorum(total_votes: u32, member_count: u32, config: &PollConfig) -> Quorum {
    if !config.quorum_enabled {
        return Quorum::Disabled;
    }
    let required = required_count(member_count, config.quorum_threshold);
    Quorum::Enabled(QuorumProgress {
        current: total_votes,
        required,
        threshold: config.quorum_threshold,
        percentage: progress_percentage(total_votes, required),
        met: total_votes >= required,
    })
}
