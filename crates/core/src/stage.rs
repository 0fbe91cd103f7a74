//! Poll lifecycle state machine.
//!
//! ```text
//!            Vote { is_ratifying: true }
//!          ┌──────────────────────────────▶ ratified
//!   open ──┤
//!          └──────────────────────────────▶ closed
//!            ClosingTimeElapsed | LimitReached
//! ```
//!
//! `ratified` and `closed` are terminal. A [`StageEvent::Snapshot`] carries an
//! authoritative stage from the server and is applied only when it moves the
//! poll forward.

#![allow(missing_docs)]

use agora_common::{AppError, AppResult};
use tracing::{debug, info, warn};

use crate::decision::AutoCloseLimit;
use crate::models::{Poll, PollStage};

/// Something that may move a poll to a new stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    /// A vote recorded by the server. `is_ratifying` is the server's verdict.
    Vote { is_ratifying: bool },
    ClosingTimeElapsed,
    LimitReached(AutoCloseLimit),
    /// Stage carried by a pushed poll snapshot.
    Snapshot(PollStage),
}

/// Result of applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged(PollStage),
    Advanced { from: PollStage, to: PollStage },
}

impl Transition {
    /// Stage after the event.
    #[must_use]
    pub const fn stage(self) -> PollStage {
        match self {
            Self::Unchanged(stage) | Self::Advanced { to: stage, .. } => stage,
        }
    }

    #[must_use]
    pub const fn is_advanced(self) -> bool {
        matches!(self, Self::Advanced { .. })
    }
}

/// Stateless poll stage transitions.
pub struct PollStageMachine;

impl PollStageMachine {
    /// Reject a local vote attempt on a terminal poll.
    ///
    /// Called before any network request is made.
    pub fn guard_vote(stage: PollStage) -> AppResult<()> {
        match stage {
            PollStage::Open => Ok(()),
            PollStage::Closed => Err(AppError::VotingClosed),
            PollStage::Ratified => Err(AppError::AlreadyRatified),
        }
    }

    /// Compute the stage that follows `event`.
    #[must_use]
    pub const fn apply(stage: PollStage, event: StageEvent) -> Transition {
        let next = match (stage, event) {
            (PollStage::Open, StageEvent::Vote { is_ratifying: true }) => PollStage::Ratified,
            (PollStage::Open, StageEvent::ClosingTimeElapsed | StageEvent::LimitReached(_)) => {
                PollStage::Closed
            }
            (PollStage::Open, StageEvent::Snapshot(target)) => target,
            _ => stage,
        };
        if next as u8 == stage as u8 {
            Transition::Unchanged(stage)
        } else {
            Transition::Advanced {
                from: stage,
                to: next,
            }
        }
    }

    /// Apply `event` to a poll in place.
    pub fn advance(poll: &mut Poll, event: StageEvent) -> Transition {
        let transition = Self::apply(poll.stage, event);
        match transition {
            Transition::Advanced { from, to } => {
                poll.stage = to;
                if to == PollStage::Ratified {
                    info!(poll_id = %poll.id, ?event, "Poll ratified");
                } else {
                    debug!(poll_id = %poll.id, ?from, ?to, ?event, "Poll stage advanced");
                }
            }
            Transition::Unchanged(stage) => {
                if matches!(event, StageEvent::Snapshot(target) if target != stage) {
                    warn!(
                        poll_id = %poll.id,
                        current = ?stage,
                        ?event,
                        "Ignoring stage regression from snapshot"
                    );
                }
            }
        }
        transition
    }
}
