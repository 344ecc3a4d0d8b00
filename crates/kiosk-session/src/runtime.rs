//! Session runtime
//!
//! Owns a [`SessionMachine`] on a single task and feeds it input events and
//! timer notices in arrival order. Renderers observe a [`SessionView`] over a
//! watch channel; input sources talk through a cloneable [`SessionHandle`].

use crate::error::SessionError;
use crate::machine::{SessionMachine, SessionView};
use crate::sink::ResponseSink;
use crate::timer::TimerFired;
use futures::{Stream, StreamExt};
use kiosk_core::{AnswerId, SessionConfig, SurveyDefinition};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const EVENT_BUFFER: usize = 100;

/// Input delivered to a running session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Respondent picked an answer for the current question
    Answer(AnswerId),
    /// Pointer, touch or key activity
    Activity,
    /// Abandon the current session
    Reset,
}

/// Single-task owner of a session machine
#[derive(Debug)]
pub struct KioskSession {
    machine: SessionMachine,
    events: mpsc::Receiver<SessionEvent>,
    timers: mpsc::UnboundedReceiver<TimerFired>,
    view_tx: watch::Sender<SessionView>,
}

impl KioskSession {
    /// Build a session and the handle that drives it. Nothing runs until
    /// [`run`](Self::run) is awaited.
    pub fn start(
        definition: SurveyDefinition,
        config: &SessionConfig,
        sink: Arc<dyn ResponseSink>,
    ) -> (Self, SessionHandle) {
        let (machine, timers) = SessionMachine::start(definition, config, sink);
        Self::from_machine(machine, timers)
    }

    /// Wrap an already started machine
    pub fn from_machine(
        machine: SessionMachine,
        timers: mpsc::UnboundedReceiver<TimerFired>,
    ) -> (Self, SessionHandle) {
        let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
        let (view_tx, view_rx) = watch::channel(machine.view());
        let session = Self {
            machine,
            events,
            timers,
            view_tx,
        };
        let handle = SessionHandle {
            events: events_tx,
            view: view_rx,
        };
        (session, handle)
    }

    /// Spawn onto the runtime and return the handle
    pub fn spawn(
        definition: SurveyDefinition,
        config: &SessionConfig,
        sink: Arc<dyn ResponseSink>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (session, handle) = Self::start(definition, config, sink);
        (handle, tokio::spawn(session.run()))
    }

    /// Process events until every [`SessionHandle`] is dropped
    pub async fn run(mut self) {
        tracing::debug!(form_id = %self.machine.definition().id, "session loop started");
        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => self.apply(event),
                    None => break,
                },
                Some(fired) = self.timers.recv() => self.machine.on_timer(fired),
            }
            self.publish();
        }
        tracing::debug!(form_id = %self.machine.definition().id, "session loop stopped");
    }

    fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Answer(id) => self.machine.answer(id),
            SessionEvent::Activity => self.machine.activity(),
            SessionEvent::Reset => self.machine.reset(),
        }
    }

    fn publish(&self) {
        let view = self.machine.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}

/// Cloneable handle to a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::Sender<SessionEvent>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    /// Deliver an event
    ///
    /// # Errors
    /// `SessionError::Closed` once the session task has stopped
    pub async fn send(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.events
            .send(event)
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Answer the current question
    ///
    /// # Errors
    /// `SessionError::Closed` once the session task has stopped
    pub async fn answer(&self, answer_id: AnswerId) -> Result<(), SessionError> {
        self.send(SessionEvent::Answer(answer_id)).await
    }

    /// Report user presence
    ///
    /// # Errors
    /// `SessionError::Closed` once the session task has stopped
    pub async fn activity(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::Activity).await
    }

    /// Abandon the current session
    ///
    /// # Errors
    /// `SessionError::Closed` once the session task has stopped
    pub async fn reset(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::Reset).await
    }

    /// Latest published view
    #[must_use]
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Receiver notified on every view change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Forward a stream of raw presence signals as activity events.
    ///
    /// The task ends when the stream ends or the session closes.
    pub fn forward_activity<S>(&self, signals: S) -> JoinHandle<()>
    where
        S: Stream<Item = ()> + Send + 'static,
    {
        let handle = self.clone();
        tokio::spawn(async move {
            let mut signals = std::pin::pin!(signals);
            while signals.next().await.is_some() {
                if handle.activity().await.is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Phase;
    use crate::sink::MockResponseSink;
    use kiosk_core::{ResponseRecord, ResponseStatus};
    use kiosk_test_utils::three_question_survey;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn config() -> SessionConfig {
        SessionConfig {
            inactivity_timeout_ms: 30_000,
            completion_display_ms: 5_000,
            shuffle_seed: None,
        }
    }

    async fn wait_for(rx: &mut watch::Receiver<SessionView>, phase: Phase, position: usize) {
        rx.wait_for(|v| v.phase == phase && v.position == position)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn view_follows_answers() {
        let mut sink = MockResponseSink::new();
        sink.expect_submit()
            .withf(|r: &ResponseRecord| r.status == ResponseStatus::Completed && r.answers.len() == 3)
            .times(1)
            .return_const(());
        let (handle, _task) = KioskSession::spawn(three_question_survey(), &config(), Arc::new(sink));
        let mut views = handle.subscribe();

        assert_eq!(handle.view().position, 0);
        handle.answer(AnswerId::new("q1a1")).await.unwrap();
        wait_for(&mut views, Phase::Active, 1).await;
        handle.answer(AnswerId::new("q2a1")).await.unwrap();
        handle.answer(AnswerId::new("q3a1")).await.unwrap();
        wait_for(&mut views, Phase::Completed, 3).await;
        assert!(handle.view().question.is_none());

        // Thank-you display elapses and a fresh session begins
        wait_for(&mut views, Phase::Active, 0).await;
    }

    #[tokio::test(start_paused = true)]
    async fn inactivity_resets_through_loop() {
        let mut sink = MockResponseSink::new();
        sink.expect_submit()
            .withf(|r: &ResponseRecord| r.status == ResponseStatus::Partial)
            .times(1)
            .return_const(());
        let (handle, _task) = KioskSession::spawn(three_question_survey(), &config(), Arc::new(sink));
        let mut views = handle.subscribe();

        handle.answer(AnswerId::new("q1a3")).await.unwrap();
        wait_for(&mut views, Phase::Active, 1).await;

        tokio::time::sleep(Duration::from_secs(31)).await;
        wait_for(&mut views, Phase::Active, 0).await;
    }

    #[tokio::test(start_paused = true)]
    async fn forwarded_activity_keeps_session_alive() {
        let mut sink = MockResponseSink::new();
        sink.expect_submit().times(0);
        let (handle, _task) = KioskSession::spawn(three_question_survey(), &config(), Arc::new(sink));
        let mut views = handle.subscribe();
        handle.answer(AnswerId::new("q1a1")).await.unwrap();
        wait_for(&mut views, Phase::Active, 1).await;

        let signals = futures::stream::unfold(0u32, |n| async move {
            if n == 4 {
                return None;
            }
            tokio::time::sleep(Duration::from_secs(20)).await;
            Some(((), n + 1))
        });
        handle.forward_activity(signals).await.unwrap();

        // 80 seconds elapsed in total, never 30 without activity
        assert_eq!(handle.view().position, 1);
    }

    #[tokio::test]
    async fn handle_reports_closed_session() {
        let (session, handle) = KioskSession::start(
            three_question_survey(),
            &config(),
            Arc::new(MockResponseSink::new()),
        );
        drop(session);
        assert_eq!(handle.activity().await, Err(SessionError::Closed));
    }

    #[tokio::test]
    async fn loop_ends_when_handles_dropped() {
        let (handle, task) = KioskSession::spawn(
            three_question_survey(),
            &config(),
            Arc::new(MockResponseSink::new()),
        );
        drop(handle);
        task.await.unwrap();
    }
}
