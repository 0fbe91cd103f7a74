//! Ratifiability predicates for each decision-making model.
//!
//! These mirror the rules the server applies when a poll closes. The client
//! uses them for derived display only; the authoritative stage always comes
//! from the server.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{DecisionMakingModel, PollConfig};
use crate::quorum::evaluate_quorum;
use crate::ratification::evaluate_ratification;
use crate::tally::VoteTally;

/// An auto-close trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AutoCloseLimit {
    Disagreements,
    Abstains,
}

impl AutoCloseLimit {
    /// Configured limit, if any.
    #[must_use]
    pub const fn limit(self, config: &PollConfig) -> Option<u32> {
        match self {
            Self::Disagreements => config.disagreements_limit,
            Self::Abstains => config.abstains_limit,
        }
    }

    /// Current count the limit is checked against.
    #[must_use]
    pub const fn count(self, tally: &VoteTally) -> u32 {
        match self {
            Self::Disagreements => tally.disagree,
            Self::Abstains => tally.abstain,
        }
    }

    /// Whether the tally has gone past this limit. An unset limit is never
    /// exceeded.
    #[must_use]
    pub const fn is_exceeded(self, tally: &VoteTally, config: &PollConfig) -> bool {
        match self.limit(config) {
            Some(limit) => self.count(tally) > limit,
            None => false,
        }
    }
}

/// Limits currently exceeded, disagreements first.
#[must_use]
pub fn exceeded_limits(tally: &VoteTally, config: &PollConfig) -> Vec<AutoCloseLimit> {
    [AutoCloseLimit::Disagreements, AutoCloseLimit::Abstains]
        .into_iter()
        .filter(|limit| limit.is_exceeded(tally, config))
        .collect()
}

/// Whether the configured closing time has passed. A poll without one is
/// treated as closable at any time.
#[must_use]
pub fn closing_time_passed(config: &PollConfig, now: DateTime<Utc>) -> bool {
    config.closing_at.is_none_or(|closing_at| now >= closing_at)
}

fn within_limits(tally: &VoteTally, config: &PollConfig) -> bool {
    tally.block == 0 && exceeded_limits(tally, config).is_empty()
}

/// Whether the poll would ratify if it were closed at `now`.
#[must_use]
pub fn is_ratifiable(
    tally: &VoteTally,
    member_count: u32,
    config: &PollConfig,
    now: DateTime<Utc>,
) -> bool {
    if !closing_time_passed(config, now) {
        return false;
    }

    let quorum_met = || evaluate_quorum(tally.total(), member_count, config).is_met();
    let threshold_met = || evaluate_ratification(tally, config.ratification_threshold).met;

    match config.decision_making_model {
        DecisionMakingModel::Consensus => {
            quorum_met() && threshold_met() && within_limits(tally, config)
        }
        DecisionMakingModel::Consent => within_limits(tally, config),
        DecisionMakingModel::MajorityVote => quorum_met() && threshold_met(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tally(agree: u32, disagree: u32, abstain: u32, block: u32) -> VoteTally {
        VoteTally {
            agree,
            disagree,
            abstain,
            block,
        }
    }

    fn config(model: DecisionMakingModel) -> PollConfig {
        PollConfig {
            decision_making_model: model,
            ..PollConfig::default()
        }
    }

    #[test]
    fn test_limits_exceeded_only_above_limit() {
        let config = PollConfig::default();
        assert!(exceeded_limits(&tally(0, 2, 2, 0), &config).is_empty());
        assert_eq!(
            exceeded_limits(&tally(0, 3, 3, 0), &config),
            vec![AutoCloseLimit::Disagreements, AutoCloseLimit::Abstains]
        );
    }

    #[test]
    fn test_unset_limit_never_exceeded() {
        let config = PollConfig {
            disagreements_limit: None,
            ..PollConfig::default()
        };
        assert!(!AutoCloseLimit::Disagreements.is_exceeded(&tally(0, 50, 0, 0), &config));
    }

    #[test]
    fn test_consensus_requires_no_blocks() {
        let now = Utc::now();
        let config = config(DecisionMakingModel::Consensus);
        assert!(is_ratifiable(&tally(3, 0, 0, 0), 4, &config, now));
        assert!(!is_ratifiable(&tally(3, 0, 0, 1), 4, &config, now));
    }

    #[test]
    fn test_consensus_requires_quorum() {
        let config = PollConfig {
            quorum_threshold: 75,
            ..config(DecisionMakingModel::Consensus)
        };
        assert!(!is_ratifiable(&tally(2, 0, 0, 0), 4, &config, Utc::now()));
    }

    #[test]
    fn test_consent_ignores_threshold() {
        let config = config(DecisionMakingModel::Consent);
        assert!(is_ratifiable(&tally(0, 1, 1, 0), 10, &config, Utc::now()));
        assert!(!is_ratifiable(&tally(0, 3, 0, 0), 10, &config, Utc::now()));
    }

    #[test]
    fn test_majority_ignores_blocks() {
        let config = config(DecisionMakingModel::MajorityVote);
        assert!(is_ratifiable(&tally(3, 1, 0, 2), 6, &config, Utc::now()));
    }

    #[test]
    fn test_not_ratifiable_before_closing() {
        let now = Utc::now();
        let config = PollConfig {
            closing_at: Some(now + Duration::hours(1)),
            ..config(DecisionMakingModel::MajorityVote)
        };
        assert!(!is_ratifiable(&tally(5, 0, 0, 0), 5, &config, now));
        assert!(is_ratifiable(
            &tally(5, 0, 0, 0),
            5,
            &config,
            now + Duration::hours(2)
        ));
    }
}
