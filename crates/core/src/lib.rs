//! Consensus polling logic for agora.
//!
//! Everything in this crate is pure and synchronous:
//!
//! - [`models`]: polls, votes, feed items and their identity keys
//! - [`tally`], [`quorum`], [`ratification`]: vote counting and threshold math
//! - [`decision`]: ratifiability under each decision-making model
//! - [`stage`]: the poll lifecycle state machine
//! - [`permission`], [`role_diff`]: role permissions and proposed role changes
//! - [`progress`]: derived display state recomputed after every merge
//! - [`proposal`]: validation of new polls and proposals
//!
//! # Example
//!
//! ```
//! use agora_core::quorum::evaluate_quorum;
//! use agora_core::models::PollConfig;
//!
//! let config = PollConfig { quorum_threshold: 40, ..PollConfig::default() };
//! assert!(evaluate_quorum(2, 5, &config).is_met());
//! ```

pub mod decision;
pub mod models;
pub mod percent;
pub mod permission;
pub mod progress;
pub mod proposal;
pub mod quorum;
pub mod ratification;
pub mod role_diff;
pub mod stage;
pub mod tally;

pub use models::*;
pub use progress::PollProgress;
pub use proposal::CreatePollInput;
pub use role_diff::{RoleChangeProposal, RoleChangeSet, RoleEdit, RoleSnapshot};
pub use stage::{PollStageMachine, StageEvent, Transition};
pub use tally::{OptionTally, VoteTally};
