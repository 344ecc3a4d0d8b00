//! Aggregate results for one survey
//!
//! Every stored response counts toward the per-answer tallies, partial ones
//! included. Percentages are relative to the number of times the question was
//! answered and rounded to the nearest whole percent.

use kiosk_core::{
    AnswerId, FormId, QuestionId, ResponseStatus, StoredResponse, SurveyDefinition,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Tally for one answer option
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerTally {
    /// Answer id
    pub answer_id: AnswerId,
    /// Label shown to admins
    pub label: String,
    /// Times picked
    pub count: usize,
    /// Share of the question's answers, `0..=100`
    pub percentage: u32,
}

/// Tallies for one question, answers in authored order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTally {
    /// Question id
    pub question_id: QuestionId,
    /// Question prompt
    pub text: String,
    /// Times this question was answered
    pub answered: usize,
    /// Per-answer tallies
    pub answers: Vec<AnswerTally>,
}

/// Aggregate view of a survey's responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResults {
    /// Survey id
    pub form_id: FormId,
    /// Survey title
    pub title: String,
    /// Sessions that reached the last question
    pub total_completed: usize,
    /// Sessions abandoned part way
    pub total_partial: usize,
    /// Per-question breakdown in authored order
    pub questions: Vec<QuestionTally>,
}

impl SurveyResults {
    /// Compute results for `definition` from its stored responses.
    ///
    /// Responses to other surveys are skipped, as are answers to questions
    /// the definition does not contain. A response counts at most once per
    /// question, with its first answer to it.
    #[must_use]
    pub fn compute(definition: &SurveyDefinition, responses: &[StoredResponse]) -> Self {
        let mut total_completed = 0;
        let mut total_partial = 0;
        let mut counts: HashMap<&QuestionId, HashMap<&AnswerId, usize>> = HashMap::new();

        for response in responses {
            let record = &response.record;
            if record.form_id != definition.id {
                tracing::debug!(response_id = %response.id, form_id = %record.form_id, "response for another survey skipped");
                continue;
            }
            match record.status {
                ResponseStatus::Completed => total_completed += 1,
                ResponseStatus::Partial => total_partial += 1,
            }
            let mut seen = HashSet::new();
            for pair in &record.answers {
                if definition.question(&pair.question_id).is_none() {
                    continue;
                }
                if !seen.insert(&pair.question_id) {
                    continue;
                }
                *counts
                    .entry(&pair.question_id)
                    .or_default()
                    .entry(&pair.answer_id)
                    .or_default() += 1;
            }
        }

        let questions = definition
            .questions
            .iter()
            .map(|question| {
                let per_answer = counts.get(&question.id);
                let answered: usize = per_answer.map_or(0, |c| c.values().sum());
                let answers = question
                    .answers
                    .iter()
                    .map(|answer| {
                        let count = per_answer
                            .and_then(|c| c.get(&answer.id))
                            .copied()
                            .unwrap_or(0);
                        AnswerTally {
                            answer_id: answer.id.clone(),
                            label: answer.display_label().to_string(),
                            count,
                            percentage: percentage(count, answered),
                        }
                    })
                    .collect();
                QuestionTally {
                    question_id: question.id.clone(),
                    text: question.text.clone(),
                    answered,
                    answers,
                }
            })
            .collect();

        Self {
            form_id: definition.id.clone(),
            title: definition.title.clone(),
            total_completed,
            total_partial,
            questions,
        }
    }

    /// All sessions that produced a response
    #[inline]
    #[must_use]
    pub fn total_responses(&self) -> usize {
        self.total_completed + self.total_partial
    }

    /// Breakdown for one question
    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&QuestionTally> {
        self.questions.iter().find(|q| &q.question_id == id)
    }
}

/// Rounded half up, as a whole percent
fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rounded = (count * 200 + total) / (total * 2);
    u32::try_from(rounded).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_core::{Answer, AnswerPair, Question, ResponseId, ResponseRecord};
    use kiosk_test_utils::three_question_survey;
    use pretty_assertions::assert_eq;

    fn stored(n: usize, record: ResponseRecord) -> StoredResponse {
        StoredResponse {
            id: ResponseId::new(format!("r{n}")),
            record,
            timestamp: chrono::Utc::now(),
        }
    }

    fn f1() -> FormId {
        FormId::new("f1")
    }

    #[test]
    fn totals_split_by_status() {
        let responses = vec![
            stored(1, ResponseRecord::completed(f1(), vec![AnswerPair::new("q1", "q1a1")])),
            stored(2, ResponseRecord::partial(f1(), vec![AnswerPair::new("q1", "q1a2")])),
            stored(3, ResponseRecord::completed(f1(), vec![AnswerPair::new("q1", "q1a1")])),
        ];
        let results = SurveyResults::compute(&three_question_survey(), &responses);
        assert_eq!(results.total_completed, 2);
        assert_eq!(results.total_partial, 1);
        assert_eq!(results.total_responses(), 3);
    }

    #[test]
    fn partial_answers_count_and_percentages_round() {
        let responses = vec![
            stored(1, ResponseRecord::completed(f1(), vec![AnswerPair::new("q1", "q1a1")])),
            stored(2, ResponseRecord::partial(f1(), vec![AnswerPair::new("q1", "q1a1")])),
            stored(3, ResponseRecord::partial(f1(), vec![AnswerPair::new("q1", "q1a2")])),
        ];
        let results = SurveyResults::compute(&three_question_survey(), &responses);
        let q1 = results.question(&QuestionId::new("q1")).unwrap();

        assert_eq!(q1.answered, 3);
        let shares: Vec<_> = q1.answers.iter().map(|a| (a.count, a.percentage)).collect();
        assert_eq!(shares, vec![(2, 67), (1, 33), (0, 0)]);

        let q2 = results.question(&QuestionId::new("q2")).unwrap();
        assert_eq!(q2.answered, 0);
        assert!(q2.answers.iter().all(|a| a.percentage == 0));
    }

    #[test]
    fn unknown_questions_and_other_surveys_ignored() {
        let responses = vec![
            stored(1, ResponseRecord::completed(f1(), vec![AnswerPair::new("q9", "q9a1")])),
            stored(
                2,
                ResponseRecord::completed(FormId::new("f2"), vec![AnswerPair::new("q1", "q1a1")]),
            ),
        ];
        let results = SurveyResults::compute(&three_question_survey(), &responses);
        assert_eq!(results.total_completed, 1);
        assert!(results.questions.iter().all(|q| q.answered == 0));
    }

    #[test]
    fn repeated_question_counts_first_answer_only() {
        let responses = vec![stored(
            1,
            ResponseRecord::completed(
                f1(),
                vec![AnswerPair::new("q1", "q1a2"), AnswerPair::new("q1", "q1a3")],
            ),
        )];
        let results = SurveyResults::compute(&three_question_survey(), &responses);
        let q1 = results.question(&QuestionId::new("q1")).unwrap();

        assert_eq!(q1.answered, 1);
        let counts: Vec<_> = q1.answers.iter().map(|a| a.count).collect();
        assert_eq!(counts, vec![0, 1, 0]);
    }

    #[test]
    fn image_answers_labelled_image() {
        let mut def = three_question_survey();
        def.questions = vec![Question::new(
            "q1",
            "Which face?",
            vec![Answer::image("smile", "faces/smile.png"), Answer::labelled("meh", "Meh")],
        )];
        let results = SurveyResults::compute(&def, &[]);
        let labels: Vec<_> = results.questions[0].answers.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["Image", "Meh"]);
    }

    #[test]
    fn half_rounds_up() {
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(5, 5), 100);
        assert_eq!(percentage(0, 0), 0);
    }
}
