//! Vote casting.
//!
//! A cast is applied to the feed before the request is sent and settled
//! once the server answers: committed with the server's vote and stage
//! verdict, or rolled back when the request fails.

use std::collections::BTreeSet;

use agora_common::{AppError, AppResult, IdGenerator};
use agora_core::models::{Fingerprint, MyVote, Poll, PollKind, PollStage, Vote, VoteChoice};
use agora_core::tally;
use agora_core::{PollStageMachine, StageEvent};
use agora_feed::FeedReconciler;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::api::{PollApiService, VoteReceipt, Voter};

/// Request a cast turns into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum VotePlan {
    /// No vote yet.
    Create,
    /// A different choice than the current vote.
    #[serde(rename_all = "camelCase")]
    Update { vote_id: String },
    /// The same choice again withdraws the vote.
    #[serde(rename_all = "camelCase")]
    Delete { vote_id: String },
}

impl VotePlan {
    /// Id of the vote being changed.
    #[must_use]
    pub fn vote_id(&self) -> Option<&str> {
        match self {
            Self::Create => None,
            Self::Update { vote_id } | Self::Delete { vote_id } => Some(vote_id),
        }
    }
}

/// Decide between create, update and delete for a cast.
#[must_use]
pub fn plan_vote(my_vote: Option<&MyVote>, choice: &VoteChoice) -> VotePlan {
    match my_vote {
        None => VotePlan::Create,
        Some(mine) if mine.choice.same_selection(choice) => VotePlan::Delete {
            vote_id: mine.id.clone(),
        },
        Some(mine) => VotePlan::Update {
            vote_id: mine.id.clone(),
        },
    }
}

/// Check that `choice` fits the poll it is cast on.
pub fn check_choice(poll: &Poll, choice: &VoteChoice) -> AppResult<()> {
    match (poll.kind, choice) {
        (PollKind::Proposal, VoteChoice::Kind(_)) => Ok(()),
        (PollKind::Poll, VoteChoice::Options(ids)) => {
            if ids.is_empty() {
                return Err(AppError::Validation(
                    "Select at least one option".to_string(),
                ));
            }
            if ids.len() > 1 && !poll.config.multiple_choice {
                return Err(AppError::Validation(
                    "This poll allows a single selection".to_string(),
                ));
            }
            if ids.iter().collect::<BTreeSet<_>>().len() != ids.len() {
                return Err(AppError::Validation(
                    "An option was selected twice".to_string(),
                ));
            }
            if let Some(unknown) = ids.iter().find(|id| !poll.has_option(id)) {
                return Err(AppError::Validation(format!(
                    "Unknown poll option: {unknown}"
                )));
            }
            Ok(())
        }
        (PollKind::Proposal, VoteChoice::Options(_)) => Err(AppError::Validation(
            "Proposals take agree, disagree, abstain or block".to_string(),
        )),
        (PollKind::Poll, VoteChoice::Kind(_)) => Err(AppError::Validation(
            "Polls take option selections".to_string(),
        )),
    }
}

/// Result of a settled cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub plan: VotePlan,
    /// The server's vote; `None` after a withdrawal.
    pub vote: Option<Vote>,
    pub is_ratifying_vote: bool,
    /// Stage of the cached poll after the commit.
    pub stage: Option<PollStage>,
}

/// Vote service.
#[derive(Clone)]
pub struct VotingService {
    api: PollApiService,
    reconciler: FeedReconciler,
    id_gen: IdGenerator,
}

impl VotingService {
    /// Create a new voting service.
    #[must_use]
    pub const fn new(api: PollApiService, reconciler: FeedReconciler) -> Self {
        Self {
            api,
            reconciler,
            id_gen: IdGenerator::new(),
        }
    }

    /// Cast `choice` on a cached poll.
    ///
    /// Casting the current choice again withdraws the vote. Validation
    /// failures, a terminal stage and a cast already in flight for the same
    /// poll are rejected before any request is sent. A failed request rolls
    /// the feed back and returns the error.
    pub async fn cast_vote(
        &self,
        channel_id: &str,
        poll_id: &str,
        choice: VoteChoice,
    ) -> AppResult<VoteOutcome> {
        let user_id = self.reconciler.session().user_id.clone();
        let fingerprint = Fingerprint::vote(channel_id, poll_id);
        let temp_vote_id = self.id_gen.generate();
        let now = Utc::now();

        let plan = self
            .reconciler
            .begin_update(fingerprint.clone(), poll_id, |item| {
                let poll = item
                    .as_poll_mut()
                    .ok_or_else(|| AppError::Validation(format!("{poll_id} is not a poll")))?;
                PollStageMachine::guard_vote(poll.stage)?;
                check_choice(poll, &choice)?;

                let mine = poll
                    .my_vote
                    .clone()
                    .or_else(|| poll.vote_of(&user_id).map(MyVote::from));
                let plan = plan_vote(mine.as_ref(), &choice);
                if matches!(plan, VotePlan::Delete { .. }) {
                    poll.remove_vote_of(&user_id);
                    poll.my_vote = None;
                } else {
                    let vote = Vote {
                        id: plan.vote_id().unwrap_or(&temp_vote_id).to_string(),
                        poll_id: poll_id.to_string(),
                        voter_id: user_id.clone(),
                        choice: choice.clone(),
                        created_at: now,
                    };
                    poll.my_vote = Some(MyVote::from(&vote));
                    poll.upsert_vote(vote);
                }
                Ok(plan)
            })
            .await?;
        debug!(%fingerprint, ?plan, "Vote applied speculatively");

        let result = match &plan {
            VotePlan::Create => self
                .api
                .create_vote(channel_id, poll_id, &choice)
                .await
                .map(Some),
            VotePlan::Update { vote_id } => self
                .api
                .update_vote(channel_id, poll_id, vote_id, &choice)
                .await
                .map(Some),
            VotePlan::Delete { vote_id } => self
                .api
                .delete_vote(channel_id, poll_id, vote_id)
                .await
                .map(|()| None),
        };
        let receipt: Option<VoteReceipt> = match result {
            Ok(receipt) => receipt,
            Err(err) => {
                self.reconciler.rollback(&fingerprint).await;
                err.log();
                return Err(err);
            }
        };

        let is_ratifying_vote = receipt.as_ref().is_some_and(|r| r.is_ratifying_vote);
        self.reconciler
            .commit_update(&fingerprint, |item| {
                let Some(poll) = item.as_poll_mut() else {
                    return;
                };
                match &receipt {
                    Some(receipt) => {
                        poll.upsert_vote(receipt.vote.clone());
                        poll.my_vote = Some(MyVote::from(&receipt.vote));
                        PollStageMachine::advance(
                            poll,
                            StageEvent::Vote {
                                is_ratifying: receipt.is_ratifying_vote,
                            },
                        );
                    }
                    None => {
                        poll.remove_vote_of(&user_id);
                        poll.my_vote = None;
                    }
                }
            })
            .await;

        let stage = self
            .reconciler
            .get(channel_id, poll_id)
            .await
            .and_then(|entry| entry.item.as_poll().map(|poll| poll.stage));
        info!(%fingerprint, ?plan, is_ratifying_vote, ?stage, "Vote committed");

        Ok(VoteOutcome {
            plan,
            vote: receipt.map(|r| r.vote),
            is_ratifying_vote,
            stage,
        })
    }

    /// Members who selected an option, as reported by the server.
    pub async fn voters_for_option(
        &self,
        channel_id: &str,
        poll_id: &str,
        option_id: &str,
    ) -> AppResult<Vec<Voter>> {
        let unknown = self.reconciler.get(channel_id, poll_id).await.is_some_and(|entry| {
            entry
                .item
                .as_poll()
                .is_some_and(|poll| !poll.has_option(option_id))
        });
        if unknown {
            return Err(AppError::Validation(format!(
                "Unknown poll option: {option_id}"
            )));
        }
        self.api
            .get_voters_by_poll_option(channel_id, poll_id, option_id)
            .await
    }

    /// Voter ids of an option from the cached poll, without a request.
    pub async fn cached_voters_for_option(
        &self,
        channel_id: &str,
        poll_id: &str,
        option_id: &str,
    ) -> Vec<String> {
        self.reconciler
            .get(channel_id, poll_id)
            .await
            .and_then(|entry| {
                entry.item.as_poll().map(|poll| {
                    tally::voters_for_option(
                        &poll.votes,
                        &poll.options,
                        poll.config.multiple_choice,
                        option_id,
                    )
                        .into_iter()
                        .map(str::to_string)
                        .collect()
                })
            })
            .unwrap_or_default()
    }
}
