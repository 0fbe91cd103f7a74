//! Client service tests against an in-memory server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use agora_client::{
    FeedLoader, PollApi, PollApiService, ProposalService, VoteReceipt, VotePlan, Voter,
    VotingService,
};
use agora_common::{AppError, AppResult, IdGenerator};
use agora_core::models::{
    FeedItem, Message, Poll, PollConfig, PollKind, PollOption, PollStage, SessionContext, Vote,
    VoteChoice, VoteKind,
};
use agora_core::permission::Permission;
use agora_core::{CreatePollInput, PollProgress, RoleChangeProposal, RoleEdit, RoleSnapshot, tally};
use agora_feed::{FeedReconciler, PushDispatcher, PushEnvelope, SubscriptionKey};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use maplit::btreeset;
use tokio::sync::{Mutex, Notify};

/// Server state shared by every member's API handle.
#[derive(Default)]
struct MemoryServer {
    polls: Mutex<HashMap<String, Poll>>,
    messages: Mutex<Vec<Message>>,
    calls: AtomicUsize,
    fail_next: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
    entered: Notify,
}

impl MemoryServer {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().await.clone();
        if let Some(gate) = gate {
            self.entered.notify_one();
            gate.notified().await;
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AppError::Transport("connection reset".to_string()));
        }
        Ok(())
    }

    async fn poll(&self, poll_id: &str) -> Poll {
        self.polls.lock().await.get(poll_id).cloned().unwrap()
    }

    async fn record_vote(
        &self,
        user_id: &str,
        poll_id: &str,
        vote_id: String,
        choice: &VoteChoice,
    ) -> AppResult<VoteReceipt> {
        let mut polls = self.polls.lock().await;
        let poll = polls
            .get_mut(poll_id)
            .ok_or_else(|| AppError::NotFound(poll_id.to_string()))?;
        let vote = Vote {
            id: vote_id,
            poll_id: poll_id.to_string(),
            voter_id: user_id.to_string(),
            choice: choice.clone(),
            created_at: Utc::now(),
        };
        poll.upsert_vote(vote.clone());

        let is_ratifying_vote = poll.stage == PollStage::Open
            && poll.kind == PollKind::Proposal
            && PollProgress::compute(poll, Utc::now()).ratifiable;
        if is_ratifying_vote {
            poll.stage = PollStage::Ratified;
        }
        Ok(VoteReceipt {
            vote,
            is_ratifying_vote,
        })
    }
}

/// One member's view of the server.
struct MemoryApi {
    server: Arc<MemoryServer>,
    user_id: String,
    id_gen: IdGenerator,
}

impl MemoryApi {
    fn service(server: &Arc<MemoryServer>, user_id: &str) -> PollApiService {
        Arc::new(Self {
            server: Arc::clone(server),
            user_id: user_id.to_string(),
            id_gen: IdGenerator::new(),
        })
    }
}

#[async_trait]
impl PollApi for MemoryApi {
    async fn create_vote(
        &self,
        _channel_id: &str,
        poll_id: &str,
        choice: &VoteChoice,
    ) -> AppResult<VoteReceipt> {
        self.server.enter().await?;
        self.server
            .record_vote(&self.user_id, poll_id, self.id_gen.generate_uuid_v4(), choice)
            .await
    }

    async fn update_vote(
        &self,
        _channel_id: &str,
        poll_id: &str,
        vote_id: &str,
        choice: &VoteChoice,
    ) -> AppResult<VoteReceipt> {
        self.server.enter().await?;
        self.server
            .record_vote(&self.user_id, poll_id, vote_id.to_string(), choice)
            .await
    }

    async fn delete_vote(&self, _channel_id: &str, poll_id: &str, vote_id: &str) -> AppResult<()> {
        self.server.enter().await?;
        let mut polls = self.server.polls.lock().await;
        if let Some(poll) = polls.get_mut(poll_id) {
            poll.votes.retain(|v| v.id != vote_id);
        }
        Ok(())
    }

    async fn create_poll(&self, input: &CreatePollInput) -> AppResult<Poll> {
        self.server.enter().await?;
        let id = self.id_gen.generate_uuid_v4();
        let poll = input.to_pending_poll(&id, &self.user_id, 4, Utc::now());
        self.server
            .polls
            .lock()
            .await
            .insert(id, poll.clone());
        Ok(poll)
    }

    async fn get_voters_by_poll_option(
        &self,
        _channel_id: &str,
        poll_id: &str,
        option_id: &str,
    ) -> AppResult<Vec<Voter>> {
        self.server.enter().await?;
        let poll = self.server.poll(poll_id).await;
        Ok(tally::voters_for_option(
            &poll.votes,
            &poll.options,
            poll.config.multiple_choice,
            option_id,
        )
            .into_iter()
            .map(|id| Voter {
                id: id.to_string(),
                name: None,
            })
            .collect())
    }

    async fn get_channel_feed(
        &self,
        channel_id: &str,
        offset: usize,
        limit: usize,
    ) -> AppResult<Vec<FeedItem>> {
        self.server.enter().await?;
        let mut items: Vec<FeedItem> = self
            .server
            .polls
            .lock()
            .await
            .values()
            .cloned()
            .map(FeedItem::Poll)
            .chain(
                self.server
                    .messages
                    .lock()
                    .await
                    .iter()
                    .cloned()
                    .map(FeedItem::Message),
            )
            .filter(|item| item.channel_id() == channel_id)
            .collect();
        items.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.id().cmp(a.id())));
        Ok(items.into_iter().skip(offset).take(limit).collect())
    }
}

fn proposal(id: &str, minutes_ago: i64) -> Poll {
    Poll {
        id: id.to_string(),
        channel_id: "c1".to_string(),
        body: "Move the weekly call to Thursday".to_string(),
        creator_id: "u2".to_string(),
        created_at: Utc::now() - Duration::minutes(minutes_ago),
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

fn agree() -> VoteChoice {
    VoteChoice::Kind(VoteKind::Agree)
}

fn disagree() -> VoteChoice {
    VoteChoice::Kind(VoteKind::Disagree)
}

struct Member {
    reconciler: FeedReconciler,
    voting: VotingService,
    proposals: ProposalService,
    loader: FeedLoader,
}

impl Member {
    async fn join(server: &Arc<MemoryServer>, user_id: &str) -> Self {
        let api = MemoryApi::service(server, user_id);
        let reconciler = FeedReconciler::new(SessionContext::new(user_id));
        let member = Self {
            voting: VotingService::new(api.clone(), reconciler.clone()),
            proposals: ProposalService::new(api.clone(), reconciler.clone()),
            loader: FeedLoader::new(api, reconciler.clone(), 20),
            reconciler,
        };
        member.loader.load_next_page("c1").await.unwrap();
        member
    }

    async fn poll(&self, poll_id: &str) -> Poll {
        let entry = self.reconciler.get("c1", poll_id).await.unwrap();
        entry.item.as_poll().unwrap().clone()
    }
}

async fn server_with(polls: Vec<Poll>) -> Arc<MemoryServer> {
    let server = Arc::new(MemoryServer::default());
    {
        let mut state = server.polls.lock().await;
        for poll in polls {
            state.insert(poll.id.clone(), poll);
        }
    }
    server
}

#[tokio::test]
async fn test_ratification_end_to_end() {
    let server = server_with(vec![proposal("p1", 10)]).await;
    let me = Member::join(&server, "u1").await;

    let dispatcher = PushDispatcher::new(me.reconciler.clone(), SubscriptionKey::new("c1", "u1"));

    // Two other members vote; their votes reach us by push.
    let u2 = MemoryApi::service(&server, "u2");
    let u3 = MemoryApi::service(&server, "u3");
    assert!(!u2.create_vote("c1", "p1", &disagree()).await.unwrap().is_ratifying_vote);
    assert!(!u3.create_vote("c1", "p1", &agree()).await.unwrap().is_ratifying_vote);
    assert!(dispatcher.handle(PushEnvelope::Poll(server.poll("p1").await)).await);
    assert!(me.poll("p1").await.my_vote.is_none());

    // The third vote meets quorum (3 of 2 required) and the threshold (2 of 2).
    let outcome = me.voting.cast_vote("c1", "p1", agree()).await.unwrap();
    assert_eq!(outcome.plan, VotePlan::Create);
    assert!(outcome.is_ratifying_vote);
    assert_eq!(outcome.stage, Some(PollStage::Ratified));

    let entry = me.reconciler.get("c1", "p1").await.unwrap();
    let progress = entry.progress.unwrap();
    assert!(progress.quorum.is_met());
    assert_eq!(progress.ratification.required, 2);
    assert!(progress.ratification.met);

    // A fourth disagree lands on the server and reaches us by push.
    let u4 = MemoryApi::service(&server, "u4");
    u4.create_vote("c1", "p1", &disagree()).await.unwrap();
    assert!(dispatcher.handle(PushEnvelope::Poll(server.poll("p1").await)).await);

    let poll = me.poll("p1").await;
    assert_eq!(poll.stage, PollStage::Ratified);
    assert_eq!(poll.votes.len(), 4);
    let progress = me.reconciler.get("c1", "p1").await.unwrap().progress.unwrap();
    assert_eq!(progress.tally.disagree, 2);

    // Voting stays closed: the cast is refused before any request.
    let calls = server.calls();
    let err = me.voting.cast_vote("c1", "p1", disagree()).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyRatified));
    assert_eq!(server.calls(), calls);
}

#[tokio::test]
async fn test_closed_poll_blocks_network() {
    let mut closed = proposal("p1", 10);
    closed.stage = PollStage::Closed;
    let server = server_with(vec![closed]).await;
    let me = Member::join(&server, "u1").await;
    let calls = server.calls();

    let err = me.voting.cast_vote("c1", "p1", agree()).await.unwrap_err();
    assert!(matches!(err, AppError::VotingClosed));
    assert!(err.is_validation());
    assert_eq!(server.calls(), calls);
    assert_eq!(me.reconciler.pending_count("c1").await, 0);
}

#[tokio::test]
async fn test_same_choice_toggles_vote_off() {
    let server = server_with(vec![proposal("p1", 10)]).await;
    let me = Member::join(&server, "u1").await;

    let first = me.voting.cast_vote("c1", "p1", agree()).await.unwrap();
    let vote_id = first.vote.unwrap().id;
    assert_eq!(me.poll("p1").await.my_vote.unwrap().id, vote_id);

    let changed = me.voting.cast_vote("c1", "p1", disagree()).await.unwrap();
    assert_eq!(
        changed.plan,
        VotePlan::Update {
            vote_id: vote_id.clone()
        }
    );
    assert_eq!(me.poll("p1").await.votes.len(), 1);

    let withdrawn = me.voting.cast_vote("c1", "p1", disagree()).await.unwrap();
    assert_eq!(withdrawn.plan, VotePlan::Delete { vote_id });
    assert!(withdrawn.vote.is_none());

    let poll = me.poll("p1").await;
    assert!(poll.votes.is_empty());
    assert!(poll.my_vote.is_none());
    assert!(server.poll("p1").await.votes.is_empty());
}

#[tokio::test]
async fn test_transport_failure_rolls_back() {
    let server = server_with(vec![proposal("p1", 10)]).await;
    let me = Member::join(&server, "u1").await;
    let before = me.poll("p1").await;

    server.fail_next.store(true, Ordering::SeqCst);
    let err = me.voting.cast_vote("c1", "p1", agree()).await.unwrap_err();
    assert_eq!(err.error_code(), "TRANSPORT_ERROR");

    assert_eq!(me.poll("p1").await, before);
    assert_eq!(me.reconciler.pending_count("c1").await, 0);

    // The poll can be voted on again once the failure clears.
    me.voting.cast_vote("c1", "p1", agree()).await.unwrap();
}

#[tokio::test]
async fn test_second_cast_while_in_flight_is_rejected() {
    let server = server_with(vec![proposal("p1", 10)]).await;
    let me = Member::join(&server, "u1").await;

    let gate = Arc::new(Notify::new());
    *server.gate.lock().await = Some(Arc::clone(&gate));
    let calls = server.calls();

    let voting = me.voting.clone();
    let first = tokio::spawn(async move { voting.cast_vote("c1", "p1", agree()).await });
    server.entered.notified().await;

    // The speculative vote is already visible.
    assert_eq!(me.poll("p1").await.votes.len(), 1);

    let err = me.voting.cast_vote("c1", "p1", disagree()).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateSubmission(_)));
    assert_eq!(server.calls(), calls + 1);

    gate.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome.plan, VotePlan::Create);
    assert_eq!(me.reconciler.pending_count("c1").await, 0);
}

#[tokio::test]
async fn test_option_poll_vote_and_voters() {
    let mut lunch = proposal("p1", 10);
    lunch.kind = PollKind::Poll;
    lunch.config.multiple_choice = true;
    lunch.options = vec![
        PollOption {
            id: "o1".to_string(),
            text: "Tacos".to_string(),
        },
        PollOption {
            id: "o2".to_string(),
            text: "Ramen".to_string(),
        },
    ];
    let server = server_with(vec![lunch]).await;
    let me = Member::join(&server, "u1").await;

    let choice = VoteChoice::Options(vec!["o1".to_string(), "o2".to_string()]);
    me.voting.cast_vote("c1", "p1", choice).await.unwrap();

    let progress = me.reconciler.get("c1", "p1").await.unwrap().progress.unwrap();
    let shares = progress.options.unwrap();
    assert_eq!(shares.len(), 2);
    assert!(shares.iter().all(|share| share.count == 1 && share.percentage == 50));

    let voters = me.voting.voters_for_option("c1", "p1", "o2").await.unwrap();
    assert_eq!(voters.iter().map(|v| v.id.as_str()).collect::<Vec<_>>(), vec!["u1"]);
    assert_eq!(me.voting.cached_voters_for_option("c1", "p1", "o1").await, vec!["u1"]);

    let calls = server.calls();
    let err = me.voting.voters_for_option("c1", "p1", "o9").await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(server.calls(), calls);
}

#[tokio::test]
async fn test_submit_proposal_replaces_pending_poll() {
    let server = server_with(vec![]).await;
    let me = Member::join(&server, "u1").await;

    let input = CreatePollInput {
        channel_id: "c1".to_string(),
        body: "Adopt a code of conduct".to_string(),
        kind: PollKind::Proposal,
        options: vec![],
        config: PollConfig::default(),
        action: None,
    };
    let poll = me.proposals.submit(input, 4).await.unwrap();

    let items = me.reconciler.items("c1").await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id(), poll.id);
    assert_eq!(me.reconciler.pending_count("c1").await, 0);
}

#[tokio::test]
async fn test_failed_submit_restores_feed() {
    let server = server_with(vec![proposal("p1", 10)]).await;
    let me = Member::join(&server, "u1").await;
    let before = me.reconciler.items("c1").await;

    server.fail_next.store(true, Ordering::SeqCst);
    let input = CreatePollInput {
        channel_id: "c1".to_string(),
        body: "Lunch?".to_string(),
        kind: PollKind::Poll,
        options: vec!["Tacos".to_string(), "Ramen".to_string()],
        config: PollConfig::default(),
        action: None,
    };
    assert!(me.proposals.submit(input, 4).await.is_err());
    assert_eq!(me.reconciler.items("c1").await, before);
}

#[tokio::test]
async fn test_role_change_proposal() {
    let server = server_with(vec![]).await;
    let me = Member::join(&server, "u1").await;
    let baseline = RoleSnapshot {
        id: "r1".to_string(),
        name: "Moderators".to_string(),
        color: "#336699".to_string(),
        permissions: Permission::ManageChannels.capabilities().iter().copied().collect(),
        members: btreeset! {"u1".to_string()},
    };

    // An untouched form proposes nothing and never reaches the server.
    let calls = server.calls();
    let err = RoleChangeProposal::change_role(baseline.clone(), &RoleEdit::from_snapshot(&baseline))
        .unwrap_err();
    assert!(matches!(err, AppError::NoChangesProposed));
    assert_eq!(server.calls(), calls);

    let mut edit = RoleEdit::from_snapshot(&baseline);
    edit.permissions.insert(Permission::ManageRoles, true);
    edit.members.insert("u2".to_string());
    let proposal = RoleChangeProposal::change_role(baseline, &edit).unwrap();
    let proposed = proposal.proposed_role();
    assert!(Permission::ManageRoles.is_granted_by(&proposed.permissions));

    let poll = me
        .proposals
        .propose_role_change("c1", "Promote u2", proposal, PollConfig::default(), 4)
        .await
        .unwrap();
    assert!(poll.action.is_some());
    assert!(me.reconciler.get("c1", &poll.id).await.is_some());
}

#[tokio::test]
async fn test_loader_pages_until_exhausted() {
    let server = server_with(vec![proposal("p1", 30), proposal("p2", 20)]).await;
    server.messages.lock().await.push(Message {
        id: "m1".to_string(),
        channel_id: "c1".to_string(),
        body: Some("hello".to_string()),
        author_id: Some("u2".to_string()),
        bot_id: None,
        images: vec![],
        created_at: Utc::now() - Duration::minutes(40),
    });

    let reconciler = FeedReconciler::new(SessionContext::new("u1"));
    let loader = FeedLoader::new(MemoryApi::service(&server, "u1"), reconciler.clone(), 2);

    assert_eq!(loader.load_next_page("c1").await.unwrap(), Some(2));
    assert_eq!(loader.load_next_page("c1").await.unwrap(), Some(1));
    assert_eq!(loader.load_next_page("c1").await.unwrap(), Some(0));
    assert_eq!(loader.load_next_page("c1").await.unwrap(), None);

    let ids: Vec<String> = reconciler
        .items("c1")
        .await
        .iter()
        .map(|item| item.id().to_string())
        .collect();
    assert_eq!(ids, vec!["p2", "p1", "m1"]);
}
