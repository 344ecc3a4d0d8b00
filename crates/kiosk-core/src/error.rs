//! Error types for the survey kiosk
//!
//! Provides error handling for:
//! - Remote store failures
//! - Authoring validation
//! - Configuration loading

use crate::types::{AnswerId, FormId, QuestionId};

/// Failures reported by a [`SurveyGateway`](crate::SurveyGateway)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Store unreachable or timed out
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Definition does not exist
    #[error("survey not found: {0}")]
    NotFound(FormId),

    /// Store refused the write
    #[error("write rejected: {0}")]
    Rejected(String),
}

impl GatewayError {
    /// Check if the failure is transient
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Authoring validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    /// Title is blank
    #[error("survey title is empty")]
    EmptyTitle,

    /// No questions at all
    #[error("survey has no questions")]
    NoQuestions,

    /// Question prompt is blank
    #[error("question {0} has no text")]
    EmptyQuestionText(QuestionId),

    /// Question offers nothing to pick
    #[error("question {0} has no answers")]
    NoAnswers(QuestionId),

    /// Answer has neither label nor image
    #[error("answer {answer} of question {question} needs a label or an image")]
    UnlabelledAnswer {
        /// Owning question
        question: QuestionId,
        /// Offending answer
        answer: AnswerId,
    },

    /// Question id used twice
    #[error("duplicate question id: {0}")]
    DuplicateQuestion(QuestionId),

    /// Answer id used twice within one question
    #[error("duplicate answer id {answer} in question {question}")]
    DuplicateAnswer {
        /// Owning question
        question: QuestionId,
        /// Repeated answer id
        answer: AnswerId,
    },
}

/// Configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was read
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A duration was configured as zero
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}
