//! Poll and proposal submission.

use agora_common::{AppResult, IdGenerator};
use agora_core::models::{FeedItem, Fingerprint, Poll, PollConfig, PollKind};
use agora_core::{CreatePollInput, RoleChangeProposal};
use agora_feed::FeedReconciler;
use chrono::Utc;
use tracing::{debug, info};

use crate::api::PollApiService;

/// Proposal service.
#[derive(Clone)]
pub struct ProposalService {
    api: PollApiService,
    reconciler: FeedReconciler,
    id_gen: IdGenerator,
}

impl ProposalService {
    /// Create a new proposal service.
    #[must_use]
    pub const fn new(api: PollApiService, reconciler: FeedReconciler) -> Self {
        Self {
            api,
            reconciler,
            id_gen: IdGenerator::new(),
        }
    }

    /// Validate and submit a poll or proposal.
    ///
    /// The poll shows up in the channel feed under a temporary id right
    /// away and is replaced by the server's poll once created. On failure
    /// the feed is restored and the error returned.
    pub async fn submit(&self, input: CreatePollInput, member_count: u32) -> AppResult<Poll> {
        let now = Utc::now();
        input.validate_input(now)?;

        let temp_id = self.id_gen.generate();
        let fingerprint = Fingerprint::insert(&input.channel_id, &temp_id);
        let pending = input.to_pending_poll(
            &temp_id,
            &self.reconciler.session().user_id,
            member_count,
            now,
        );
        self.reconciler
            .optimistic_insert(fingerprint.clone(), FeedItem::Poll(pending))
            .await?;
        debug!(%fingerprint, kind = ?input.kind, "Submitting poll");

        match self.api.create_poll(&input).await {
            Ok(poll) => {
                self.reconciler
                    .commit(&fingerprint, FeedItem::Poll(poll.clone()))
                    .await;
                info!(%fingerprint, poll_id = %poll.id, "Poll created");
                Ok(poll)
            }
            Err(err) => {
                self.reconciler.rollback(&fingerprint).await;
                err.log();
                Err(err)
            }
        }
    }

    /// Submit a proposal that changes or creates a role once ratified.
    pub async fn propose_role_change(
        &self,
        channel_id: &str,
        body: &str,
        proposal: RoleChangeProposal,
        config: PollConfig,
        member_count: u32,
    ) -> AppResult<Poll> {
        let input = CreatePollInput {
            channel_id: channel_id.to_string(),
            body: body.to_string(),
            kind: PollKind::Proposal,
            options: Vec::new(),
            config,
            action: Some(proposal.into_action()),
        };
        self.submit(input, member_count).await
    }
}
