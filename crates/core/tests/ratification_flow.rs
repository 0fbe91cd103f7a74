//! Poll lifecycle tests across tally, progress and stage transitions.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use agora_core::models::{
    Poll, PollConfig, PollKind, PollStage, Vote, VoteChoice, VoteKind,
};
use agora_core::{PollProgress, PollStageMachine, StageEvent, Transition};
use chrono::{Duration, Utc};

fn proposal() -> Poll {
    Poll {
        id: "p1".to_string(),
        channel_id: "c1".to_string(),
        body: "Move meetings to Thursday".to_string(),
        creator_id: "u1".to_string(),
        created_at: Utc::now(),
        kind: PollKind::Proposal,
        config: PollConfig {
            quorum_threshold: 50,
            ratification_threshold: 66,
            ..PollConfig::default()
        },
        options: vec![],
        votes: vec![],
        stage: PollStage::Open,
        member_count_at_creation: 4,
        my_vote: None,
        action: None,
    }
}

fn vote(voter: &str, kind: VoteKind) -> Vote {
    Vote {
        id: format!("v-{voter}"),
        poll_id: "p1".to_string(),
        voter_id: voter.to_string(),
        choice: VoteChoice::Kind(kind),
        created_at: Utc::now(),
    }
}

/// Record a server-confirmed vote and let the server's verdict drive the stage.
fn record(poll: &mut Poll, vote: Vote, is_ratifying: bool) -> Transition {
    poll.upsert_vote(vote);
    PollStageMachine::advance(poll, StageEvent::Vote { is_ratifying })
}

#[test]
fn test_four_member_proposal_ratifies_and_stays_ratified() {
    let mut poll = proposal();

    record(&mut poll, vote("u1", VoteKind::Agree), false);
    let progress = PollProgress::compute(&poll, Utc::now());
    assert!(!progress.quorum.is_met());
    assert_eq!(poll.stage, PollStage::Open);

    record(&mut poll, vote("u2", VoteKind::Agree), false);
    let progress = PollProgress::compute(&poll, Utc::now());
    assert!(progress.quorum.is_met());
    assert!(progress.ratification.met);

    let transition = record(&mut poll, vote("u3", VoteKind::Disagree), true);
    assert_eq!(
        transition,
        Transition::Advanced {
            from: PollStage::Open,
            to: PollStage::Ratified
        }
    );
    let progress = PollProgress::compute(&poll, Utc::now());
    assert_eq!(progress.ratification.participant_votes, 3);
    assert_eq!(progress.ratification.required, 2);
    assert!(progress.ratification.met);

    // A late vote is tallied but the stage is terminal.
    let transition = record(&mut poll, vote("u4", VoteKind::Disagree), false);
    assert_eq!(transition, Transition::Unchanged(PollStage::Ratified));
    let progress = PollProgress::compute(&poll, Utc::now());
    assert_eq!(progress.tally.disagree, 2);
    assert_eq!(poll.stage, PollStage::Ratified);
    assert!(PollStageMachine::guard_vote(poll.stage).is_err());
}

#[test]
fn test_limit_closes_open_poll() {
    let mut poll = proposal();
    for voter in ["u1", "u2", "u3"] {
        record(&mut poll, vote(voter, VoteKind::Disagree), false);
    }
    let progress = PollProgress::compute(&poll, Utc::now());
    assert_eq!(progress.exceeded_limits.len(), 1);

    for limit in progress.exceeded_limits {
        PollStageMachine::advance(&mut poll, StageEvent::LimitReached(limit));
    }
    assert_eq!(poll.stage, PollStage::Closed);
}

#[test]
fn test_snapshot_regression_is_ignored() {
    let mut poll = proposal();
    PollStageMachine::advance(&mut poll, StageEvent::ClosingTimeElapsed);
    assert_eq!(poll.stage, PollStage::Closed);

    let transition = PollStageMachine::advance(&mut poll, StageEvent::Snapshot(PollStage::Open));
    assert!(!transition.is_advanced());
    assert_eq!(poll.stage, PollStage::Closed);
}

#[test]
fn test_ratifiable_only_after_closing_time() {
    let now = Utc::now();
    let mut poll = proposal();
    poll.config.closing_at = Some(now + Duration::days(1));
    for voter in ["u1", "u2", "u3"] {
        poll.upsert_vote(vote(voter, VoteKind::Agree));
    }
    assert!(!PollProgress::compute(&poll, now).ratifiable);
    assert!(PollProgress::compute(&poll, now + Duration::days(2)).ratifiable);
}
