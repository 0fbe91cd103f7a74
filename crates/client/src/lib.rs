//! Client services for agora channels.
//!
//! Connects the feed reconciler to the server through the [`PollApi`] trait:
//!
//! - [`VotingService`] casts, changes and withdraws votes
//! - [`ProposalService`] submits polls, proposals and role change proposals
//! - [`FeedLoader`] pages older feed items in

pub mod api;
pub mod loader;
pub mod proposal;
pub mod voting;

pub use api::{PollApi, PollApiService, VoteReceipt, Voter};
pub use loader::FeedLoader;
pub use proposal::ProposalService;
pub use voting::{VoteOutcome, VotePlan, VotingService, check_choice, plan_vote};
