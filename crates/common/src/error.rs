//! Error types for agora.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Validation Errors (rejected before any network call) ===
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Voting has ended")]
    VotingClosed,

    #[error("Poll has already been ratified")]
    AlreadyRatified,

    #[error("No changes proposed")]
    NoChangesProposed,

    #[error("Mutation already in flight: {0}")]
    DuplicateSubmission(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // === Transport Errors ===
    #[error("Transport error: {0}")]
    Transport(String),

    // === Local Errors ===
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad classes of failure at the mutation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected locally; nothing was sent and nothing needs undoing.
    Validation,
    /// The round-trip failed; the speculative mutation has been rolled back.
    Transport,
    /// Anything else.
    Internal,
}

impl AppError {
    /// Returns the error code for reporting.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::VotingClosed => "VOTING_CLOSED",
            Self::AlreadyRatified => "ALREADY_RATIFIED",
            Self::NoChangesProposed => "NO_CHANGES_PROPOSED",
            Self::DuplicateSubmission(_) => "DUPLICATE_SUBMISSION",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the category this error belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_)
            | Self::VotingClosed
            | Self::AlreadyRatified
            | Self::NoChangesProposed
            | Self::DuplicateSubmission(_)
            | Self::NotFound(_) => ErrorCategory::Validation,
            Self::Transport(_) => ErrorCategory::Transport,
            Self::Serialization(_) | Self::Config(_) | Self::Internal(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Returns whether this error was raised before anything left the client.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self.category(), ErrorCategory::Validation)
    }

    /// Logs the error at a level matching its category.
    pub fn log(&self) {
        let code = self.error_code();
        match self.category() {
            ErrorCategory::Validation => {
                tracing::debug!(error = %self, code = code, "Mutation rejected");
            }
            ErrorCategory::Transport => {
                tracing::warn!(error = %self, code = code, "Mutation round-trip failed");
            }
            ErrorCategory::Internal => {
                tracing::error!(error = %self, code = code, "Internal error occurred");
            }
        }
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
