//! Core types for the survey kiosk
//!
//! Defines the records exchanged with the remote store:
//! - Survey definitions, their questions and answers
//! - Response records submitted by the kiosk
//! - Authoring inputs (new surveys, patches)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap a raw identifier
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Opaque survey definition identifier
    FormId
);
string_id!(
    /// Question identifier, unique within a definition
    QuestionId
);
string_id!(
    /// Answer identifier, unique within a question
    AnswerId
);
string_id!(
    /// Store-assigned response identifier
    ResponseId
);

/// Lifecycle status of a survey definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    /// Being authored, not shown on the kiosk
    #[default]
    Draft,
    /// Shown on the kiosk; at most one definition holds this status
    Active,
    /// Retired
    Archived,
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Archived => "archived",
        };
        f.write_str(s)
    }
}

/// A selectable answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    /// Answer identifier
    pub id: AnswerId,
    /// Text label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Image shown instead of (or next to) the label
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "imageUrl")]
    pub image_ref: Option<String>,
}

impl Answer {
    /// Create a text answer
    #[inline]
    #[must_use]
    pub fn labelled(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: AnswerId::new(id),
            label: Some(label.into()),
            image_ref: None,
        }
    }

    /// Create an image-only answer
    #[inline]
    #[must_use]
    pub fn image(id: impl Into<String>, image_ref: impl Into<String>) -> Self {
        Self {
            id: AnswerId::new(id),
            label: None,
            image_ref: Some(image_ref.into()),
        }
    }

    /// Label to display; image-only answers read as "Image"
    #[must_use]
    pub fn display_label(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.trim().is_empty() => label,
            _ => "Image",
        }
    }
}

/// A survey question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Question identifier
    pub id: QuestionId,
    /// Prompt text
    pub text: String,
    /// Optional illustration
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "imageUrl")]
    pub image_ref: Option<String>,
    /// Answers in authored order
    pub answers: Vec<Answer>,
}

impl Question {
    /// Create a question with the given answers
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>, answers: Vec<Answer>) -> Self {
        Self {
            id: QuestionId::new(id),
            text: text.into(),
            image_ref: None,
            answers,
        }
    }

    /// Look up an answer by id
    #[must_use]
    pub fn answer(&self, id: &AnswerId) -> Option<&Answer> {
        self.answers.iter().find(|a| &a.id == id)
    }
}

/// A survey definition as held by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDefinition {
    /// Store identifier
    pub id: FormId,
    /// Title shown to admins
    pub title: String,
    /// Lifecycle status
    #[serde(default)]
    pub status: FormStatus,
    /// Whether each kiosk session permutes the questions
    #[serde(default)]
    pub randomize: bool,
    /// Questions in authored order
    pub questions: Vec<Question>,
    /// Creation time assigned by the store
    pub created_at: DateTime<Utc>,
}

impl SurveyDefinition {
    /// Build a stored definition from authoring input
    #[must_use]
    pub fn from_new(id: FormId, survey: NewSurvey, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: survey.title,
            status: FormStatus::Draft,
            randomize: survey.randomize,
            questions: survey.questions,
            created_at,
        }
    }

    /// Whether the kiosk should present this definition
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == FormStatus::Active
    }

    /// Look up a question by id
    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }
}

/// Authoring input for a new definition; the store assigns id, status and timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSurvey {
    /// Title shown to admins
    pub title: String,
    /// Whether each kiosk session permutes the questions
    #[serde(default)]
    pub randomize: bool,
    /// Questions in authored order
    pub questions: Vec<Question>,
}

/// Partial update of a definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyPatch {
    /// New title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FormStatus>,
    /// New randomize flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub randomize: Option<bool>,
    /// Replacement question list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<Question>>,
}

impl SurveyPatch {
    /// Patch that only changes the status
    #[inline]
    #[must_use]
    pub fn status(status: FormStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Whether no field is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the set fields onto a definition
    pub fn apply_to(&self, definition: &mut SurveyDefinition) {
        if let Some(title) = &self.title {
            definition.title.clone_from(title);
        }
        if let Some(status) = self.status {
            definition.status = status;
        }
        if let Some(randomize) = self.randomize {
            definition.randomize = randomize;
        }
        if let Some(questions) = &self.questions {
            definition.questions.clone_from(questions);
        }
    }
}

/// One selected answer within a response
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPair {
    /// Question that was answered
    pub question_id: QuestionId,
    /// Answer that was picked
    pub answer_id: AnswerId,
}

impl AnswerPair {
    /// Create a pair
    #[inline]
    #[must_use]
    pub fn new(question_id: impl Into<String>, answer_id: impl Into<String>) -> Self {
        Self {
            question_id: QuestionId::new(question_id),
            answer_id: AnswerId::new(answer_id),
        }
    }
}

/// How a kiosk session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// Every question was answered. Stored records without a status read as completed.
    #[default]
    Completed,
    /// Submitted on inactivity before the last question
    Partial,
}

/// Record submitted once per kiosk session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    /// Definition the answers belong to
    pub form_id: FormId,
    /// Answers in the order they were given
    pub answers: Vec<AnswerPair>,
    /// Completion status
    #[serde(default)]
    pub status: ResponseStatus,
}

impl ResponseRecord {
    /// Record for a session that reached the last question
    #[inline]
    #[must_use]
    pub fn completed(form_id: FormId, answers: Vec<AnswerPair>) -> Self {
        Self {
            form_id,
            answers,
            status: ResponseStatus::Completed,
        }
    }

    /// Record for a session abandoned mid-way
    #[inline]
    #[must_use]
    pub fn partial(form_id: FormId, answers: Vec<AnswerPair>) -> Self {
        Self {
            form_id,
            answers,
            status: ResponseStatus::Partial,
        }
    }
}

/// A response as read back from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResponse {
    /// Store-assigned id
    pub id: ResponseId,
    /// Submitted content
    #[serde(flatten)]
    pub record: ResponseRecord,
    /// Server timestamp
    pub timestamp: DateTime<Utc>,
}
