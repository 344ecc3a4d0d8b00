//! Authoring-time validation of survey definitions
//!
//! The session machine never re-checks these rules; they are enforced when a
//! definition is created or edited.

use crate::error::DefinitionError;
use crate::types::{NewSurvey, Question, SurveyDefinition};
use std::collections::HashSet;

/// Check a title and question list, reporting the first violation
///
/// # Errors
/// Returns the first [`DefinitionError`] found, in authored order.
pub fn validate_questions(title: &str, questions: &[Question]) -> Result<(), DefinitionError> {
    if title.trim().is_empty() {
        return Err(DefinitionError::EmptyTitle);
    }
    if questions.is_empty() {
        return Err(DefinitionError::NoQuestions);
    }

    let mut seen_questions = HashSet::new();
    for question in questions {
        if !seen_questions.insert(&question.id) {
            return Err(DefinitionError::DuplicateQuestion(question.id.clone()));
        }
        if question.text.trim().is_empty() {
            return Err(DefinitionError::EmptyQuestionText(question.id.clone()));
        }
        if question.answers.is_empty() {
            return Err(DefinitionError::NoAnswers(question.id.clone()));
        }

        let mut seen_answers = HashSet::new();
        for answer in &question.answers {
            if !seen_answers.insert(&answer.id) {
                return Err(DefinitionError::DuplicateAnswer {
                    question: question.id.clone(),
                    answer: answer.id.clone(),
                });
            }
            let has_label = answer.label.as_deref().is_some_and(|l| !l.trim().is_empty());
            let has_image = answer.image_ref.as_deref().is_some_and(|i| !i.trim().is_empty());
            if !has_label && !has_image {
                return Err(DefinitionError::UnlabelledAnswer {
                    question: question.id.clone(),
                    answer: answer.id.clone(),
                });
            }
        }
    }
    Ok(())
}

impl NewSurvey {
    /// Validate before submitting to the store
    ///
    /// # Errors
    /// See [`validate_questions`].
    pub fn validate(&self) -> Result<(), DefinitionError> {
        validate_questions(&self.title, &self.questions)
    }
}

impl SurveyDefinition {
    /// Validate a stored definition
    ///
    /// # Errors
    /// See [`validate_questions`].
    pub fn validate(&self) -> Result<(), DefinitionError> {
        validate_questions(&self.title, &self.questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Answer, AnswerId, QuestionId};

    fn survey(questions: Vec<Question>) -> NewSurvey {
        NewSurvey {
            title: "Visitor feedback".to_string(),
            randomize: false,
            questions,
        }
    }

    #[test]
    fn accepts_label_or_image_answers() {
        let s = survey(vec![Question::new(
            "q1",
            "How was your visit?",
            vec![Answer::labelled("a1", "Good"), Answer::image("a2", "sad.png")],
        )]);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn rejects_blank_title() {
        let mut s = survey(vec![Question::new("q1", "?", vec![Answer::labelled("a", "x")])]);
        s.title = "   ".to_string();
        assert_eq!(s.validate(), Err(DefinitionError::EmptyTitle));
    }

    #[test]
    fn rejects_empty_question_list() {
        assert_eq!(survey(vec![]).validate(), Err(DefinitionError::NoQuestions));
    }

    #[test]
    fn rejects_question_without_answers() {
        let s = survey(vec![Question::new("q1", "Anything?", vec![])]);
        assert_eq!(
            s.validate(),
            Err(DefinitionError::NoAnswers(QuestionId::new("q1")))
        );
    }

    #[test]
    fn rejects_answer_without_label_or_image() {
        let s = survey(vec![Question::new(
            "q1",
            "Rate us",
            vec![Answer {
                id: AnswerId::new("a1"),
                label: Some(String::new()),
                image_ref: None,
            }],
        )]);
        assert!(matches!(
            s.validate(),
            Err(DefinitionError::UnlabelledAnswer { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let q = Question::new("q1", "Rate us", vec![Answer::labelled("a1", "Ok")]);
        let s = survey(vec![q.clone(), q]);
        assert_eq!(
            s.validate(),
            Err(DefinitionError::DuplicateQuestion(QuestionId::new("q1")))
        );

        let s = survey(vec![Question::new(
            "q1",
            "Rate us",
            vec![Answer::labelled("a1", "Ok"), Answer::labelled("a1", "Meh")],
        )]);
        assert!(matches!(
            s.validate(),
            Err(DefinitionError::DuplicateAnswer { .. })
        ));
    }
}
