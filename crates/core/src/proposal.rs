//! Poll and proposal creation input.

#![allow(missing_docs)]

use std::collections::BTreeSet;

use agora_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Poll, PollAction, PollConfig, PollKind, PollOption, PollStage};
use crate::percent::MAX_PERCENT;

/// Maximum length of a poll body.
pub const POLL_BODY_MAX: usize = 6000;
/// Minimum number of options of a multi-option poll.
pub const MIN_POLL_OPTIONS: usize = 2;
/// Maximum number of options of a multi-option poll.
pub const MAX_POLL_OPTIONS: usize = 10;
/// Maximum length of one option.
pub const MAX_OPTION_CHARS: usize = 100;

/// Input for creating a poll or proposal.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollInput {
    pub channel_id: String,
    #[validate(length(max = 6000))]
    pub body: String,
    pub kind: PollKind,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub config: PollConfig,
    #[serde(default)]
    pub action: Option<PollAction>,
}

impl CreatePollInput {
    /// Check the input before it is sent.
    pub fn validate_input(&self, now: DateTime<Utc>) -> AppResult<()> {
        self.validate()?;

        if self.config.quorum_threshold > MAX_PERCENT
            || self.config.ratification_threshold > MAX_PERCENT
        {
            return Err(AppError::Validation(
                "Thresholds must be between 0 and 100".to_string(),
            ));
        }
        if self.config.closing_at.is_some_and(|closing_at| closing_at <= now) {
            return Err(AppError::Validation(
                "Closing time must be in the future".to_string(),
            ));
        }

        match self.kind {
            PollKind::Poll => {
                self.validate_options()?;
                if self.action.is_some() {
                    return Err(AppError::Validation(
                        "Only proposals can carry an action".to_string(),
                    ));
                }
            }
            PollKind::Proposal => {
                if !self.options.is_empty() {
                    return Err(AppError::Validation(
                        "Proposals cannot have options".to_string(),
                    ));
                }
                if self.config.multiple_choice {
                    return Err(AppError::Validation(
                        "Proposals cannot be multiple choice".to_string(),
                    ));
                }
            }
        }

        match &self.action {
            Some(PollAction::ChangeRole { changes, .. } | PollAction::CreateRole { changes })
                if changes.is_empty() =>
            {
                return Err(AppError::NoChangesProposed);
            }
            _ => {}
        }

        Ok(())
    }

    fn validate_options(&self) -> AppResult<()> {
        if self.options.len() < MIN_POLL_OPTIONS {
            return Err(AppError::Validation(format!(
                "Poll must have at least {MIN_POLL_OPTIONS} options"
            )));
        }
        if self.options.len() > MAX_POLL_OPTIONS {
            return Err(AppError::Validation(format!(
                "Poll cannot have more than {MAX_POLL_OPTIONS} options"
            )));
        }
        let mut seen = BTreeSet::new();
        for option in &self.options {
            let text = option.trim();
            if text.is_empty() {
                return Err(AppError::Validation(
                    "Poll options cannot be empty".to_string(),
                ));
            }
            if text.chars().count() > MAX_OPTION_CHARS {
                return Err(AppError::Validation(format!(
                    "Poll option is too long (max {MAX_OPTION_CHARS} chars)"
                )));
            }
            if !seen.insert(text) {
                return Err(AppError::Validation(format!(
                    "Duplicate poll option: {text}"
                )));
            }
        }
        Ok(())
    }

    /// Build the speculative poll shown while the create request is in
    /// flight. Option ids are derived from the temporary poll id.
    #[must_use]
    pub fn to_pending_poll(
        &self,
        temp_id: &str,
        creator_id: &str,
        member_count: u32,
        now: DateTime<Utc>,
    ) -> Poll {
        Poll {
            id: temp_id.to_string(),
            channel_id: self.channel_id.clone(),
            body: self.body.clone(),
            creator_id: creator_id.to_string(),
            created_at: now,
            kind: self.kind,
            config: self.config.clone(),
            options: self
                .options
                .iter()
                .enumerate()
                .map(|(i, text)| PollOption {
                    id: format!("{temp_id}-{i}"),
                    text: text.trim().to_string(),
                })
                .collect(),
            votes: Vec::new(),
            stage: PollStage::Open,
            member_count_at_creation: member_count,
            my_vote: None,
            action: self.action.clone(),
        }
    }
}
