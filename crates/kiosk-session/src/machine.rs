//! Kiosk session state machine
//!
//! ```text
//! Active(0, []) --answer--> Active(n, ..) --answer last--> Completed --display elapsed--> Active(0, [])
//!                                  |
//!                                  +--inactivity--> IdleResetPending --submit partial if any--> Active(0, [])
//! ```
//!
//! Every transition is a plain method call; the runtime serializes them.
//! Events that do not apply to the current phase are ignored.

use crate::shuffle::{question_order, session_rng};
use crate::sink::ResponseSink;
use crate::timer::{TimerFired, TimerHandle, TimerKind};
use kiosk_core::{AnswerId, AnswerPair, Question, ResponseRecord, SessionConfig, SurveyDefinition};
use rand::rngs::StdRng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Accepting answers
    Active,
    /// Last question answered, thank-you display running
    Completed,
    /// Inactivity elapsed, about to reset
    IdleResetPending,
}

/// State of the live session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    question_order: Vec<Question>,
    position: usize,
    collected_answers: Vec<AnswerPair>,
    phase: Phase,
}

impl SessionState {
    fn fresh(question_order: Vec<Question>) -> Self {
        Self {
            question_order,
            position: 0,
            collected_answers: Vec::new(),
            phase: Phase::Active,
        }
    }

    /// Questions in presentation order
    #[inline]
    #[must_use]
    pub fn question_order(&self) -> &[Question] {
        &self.question_order
    }

    /// Index of the current question; equals the question count once completed
    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Answers given so far, in order
    #[inline]
    #[must_use]
    pub fn collected_answers(&self) -> &[AnswerPair] {
        &self.collected_answers
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Question awaiting an answer
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            Phase::Active => self.question_order.get(self.position),
            _ => None,
        }
    }
}

/// Render-ready snapshot of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Current phase
    pub phase: Phase,
    /// Index of the current question
    pub position: usize,
    /// Number of questions
    pub total: usize,
    /// Question to show, if any
    pub question: Option<Question>,
}

impl SessionView {
    /// Fraction of questions answered, `0.0..=1.0`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.position as f64 / self.total as f64
    }
}

/// Drives one kiosk through repeated sessions over a single definition
pub struct SessionMachine {
    definition: SurveyDefinition,
    inactivity_timeout: Duration,
    completion_display: Duration,
    state: SessionState,
    timer: TimerHandle,
    rng: StdRng,
    sink: Arc<dyn ResponseSink>,
    timer_tx: mpsc::UnboundedSender<TimerFired>,
}

impl std::fmt::Debug for SessionMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMachine")
            .field("form_id", &self.definition.id)
            .field("state", &self.state)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}

impl SessionMachine {
    /// Start the first session and arm its inactivity timer.
    ///
    /// Timer notices arrive on the returned receiver and must be fed back
    /// through [`on_timer`](Self::on_timer). Requires a tokio runtime.
    pub fn start(
        definition: SurveyDefinition,
        config: &SessionConfig,
        sink: Arc<dyn ResponseSink>,
    ) -> (Self, mpsc::UnboundedReceiver<TimerFired>) {
        Self::start_with_rng(definition, config, sink, session_rng(config.shuffle_seed))
    }

    /// As [`start`](Self::start) with an explicit generator
    pub fn start_with_rng(
        definition: SurveyDefinition,
        config: &SessionConfig,
        sink: Arc<dyn ResponseSink>,
        mut rng: StdRng,
    ) -> (Self, mpsc::UnboundedReceiver<TimerFired>) {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let order = question_order(&definition, &mut rng);
        tracing::info!(
            form_id = %definition.id,
            questions = order.len(),
            randomize = definition.randomize,
            "session started"
        );

        let mut machine = Self {
            definition,
            inactivity_timeout: config.inactivity_timeout(),
            completion_display: config.completion_display(),
            state: SessionState::fresh(order),
            timer: TimerHandle::new(),
            rng,
            sink,
            timer_tx,
        };
        machine.arm(TimerKind::Inactivity);
        (machine, timer_rx)
    }

    /// Live state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Definition being presented
    #[inline]
    #[must_use]
    pub fn definition(&self) -> &SurveyDefinition {
        &self.definition
    }

    /// Owned timer, for inspection
    #[inline]
    #[must_use]
    pub fn timer(&self) -> &TimerHandle {
        &self.timer
    }

    /// Snapshot for rendering
    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView {
            phase: self.state.phase,
            position: self.state.position,
            total: self.state.question_order.len(),
            question: self.state.current_question().cloned(),
        }
    }

    /// Record an answer to the current question
    ///
    /// Ignored outside `Active` and for answer ids the current question does
    /// not offer.
    pub fn answer(&mut self, answer_id: AnswerId) {
        let Some(question) = self.state.current_question() else {
            tracing::debug!(phase = ?self.state.phase, answer_id = %answer_id, "answer ignored");
            return;
        };
        if question.answer(&answer_id).is_none() {
            tracing::debug!(question_id = %question.id, answer_id = %answer_id, "unknown answer ignored");
            return;
        }

        let pair = AnswerPair {
            question_id: question.id.clone(),
            answer_id,
        };
        self.state.collected_answers.push(pair);

        if self.state.position + 1 == self.state.question_order.len() {
            self.state.position = self.state.question_order.len();
            self.submit(ResponseRecord::completed(
                self.definition.id.clone(),
                self.state.collected_answers.clone(),
            ));
            self.timer.cancel();
            self.state.phase = Phase::Completed;
            tracing::info!(form_id = %self.definition.id, answers = self.state.collected_answers.len(), "session completed");
            self.arm(TimerKind::CompletionDisplay);
        } else {
            self.state.position += 1;
            self.arm(TimerKind::Inactivity);
        }
    }

    /// Raw user presence (pointer, touch, key): restarts the inactivity timer
    pub fn activity(&mut self) {
        if self.state.phase == Phase::Active {
            self.arm(TimerKind::Inactivity);
        }
    }

    /// Handle a timer notice from the receiver returned by [`start`](Self::start)
    pub fn on_timer(&mut self, fired: TimerFired) {
        match (self.timer.accept(fired), self.state.phase) {
            (Some(TimerKind::Inactivity), Phase::Active) => self.time_out(),
            (Some(TimerKind::CompletionDisplay), Phase::Completed) => {
                tracing::debug!(form_id = %self.definition.id, "completion display elapsed");
                self.reset();
            }
            (Some(kind), phase) => {
                tracing::debug!(?kind, ?phase, "timer does not apply to phase, ignored");
            }
            (None, _) => tracing::trace!(kind = ?fired.kind, "stale timer ignored"),
        }
    }

    /// Return to a pristine `Active(0, [])` session
    ///
    /// Cancels the pending timer, reshuffles when the definition is
    /// randomized, and arms a fresh inactivity timer.
    pub fn reset(&mut self) {
        self.timer.cancel();
        let order = if self.definition.randomize {
            question_order(&self.definition, &mut self.rng)
        } else {
            std::mem::take(&mut self.state.question_order)
        };
        self.state = SessionState::fresh(order);
        tracing::debug!(form_id = %self.definition.id, "session reset");
        self.arm(TimerKind::Inactivity);
    }

    fn time_out(&mut self) {
        self.state.phase = Phase::IdleResetPending;
        if self.state.collected_answers.is_empty() {
            tracing::debug!(form_id = %self.definition.id, "idle session timed out");
        } else {
            tracing::info!(
                form_id = %self.definition.id,
                answers = self.state.collected_answers.len(),
                "session abandoned, submitting partial response"
            );
            self.submit(ResponseRecord::partial(
                self.definition.id.clone(),
                self.state.collected_answers.clone(),
            ));
        }
        self.reset();
    }

    fn submit(&self, record: ResponseRecord) {
        self.sink.submit(record);
    }

    fn arm(&mut self, kind: TimerKind) {
        let after = match kind {
            TimerKind::Inactivity => self.inactivity_timeout,
            TimerKind::CompletionDisplay => self.completion_display,
        };
        let tx = self.timer_tx.clone();
        self.timer.arm(kind, after, move |fired| {
            // Receiver gone means the session was dropped
            let _ = tx.send(fired);
        });
    }
}
