use analyst_core::chart::VisualArtifact;
use analyst_core::error::AnalystError;
use analyst_core::event::StreamEvent;
use analyst_core::message::Message;
use analyst_core::query::QueryResult;

use crate::event::{EngineEvent, EventSink};
use crate::state::{AppState, TurnId};

/// Shown in place of an answer when the stream failed before producing any text
pub const CONNECTION_FAILED_NOTICE: &str = "Connection failed, please try again.";

const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStep {
    Continue,
    Finished,
}

/// One in-flight turn: the session it writes to, the assistant message being
/// filled in, and the latest result not yet paired with a chart.
#[derive(Debug)]
pub struct Turn {
    id: TurnId,
    session_id: String,
    assistant_index: usize,
    pending_result: Option<QueryResult>,
}

impl Turn {
    /// Append the user message and an empty assistant placeholder, then move
    /// to `Streaming`.
    pub fn begin(
        state: &mut AppState,
        session_id: &str,
        content: &str,
        sink: &EventSink,
    ) -> Result<Self, AnalystError> {
        let id = state.start_turn()?;

        state
            .sessions
            .push_message(session_id, Message::new_user(session_id.to_string(), content.to_string()));
        let assistant_index = state
            .sessions
            .push_message(session_id, Message::new_assistant(session_id.to_string()));

        tracing::debug!(turn = %id, session_id, "turn started");
        sink.emit(EngineEvent::TurnStarted {
            session_id: session_id.to_string(),
            turn: id,
        });

        Ok(Self {
            id,
            session_id: session_id.to_string(),
            assistant_index,
            pending_result: None,
        })
    }

    pub fn id(&self) -> TurnId {
        self.id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn pending_result(&self) -> Option<&QueryResult> {
        self.pending_result.as_ref()
    }

    fn assistant<'a>(&self, state: &'a mut AppState) -> Option<&'a mut Message> {
        state.sessions.message_mut(&self.session_id, self.assistant_index)
    }

    /// Fold one event into the state. Returns [`TurnStep::Finished`] on `done`,
    /// after which the turn must not be used again.
    pub fn apply(&mut self, state: &mut AppState, event: StreamEvent, sink: &EventSink) -> TurnStep {
        match event {
            StreamEvent::Text(text) => {
                if let Some(msg) = self.assistant(state) {
                    msg.append_text(&text);
                }
                sink.emit(EngineEvent::TextDelta { text });
            }
            StreamEvent::Sql(sql) => {
                if let Some(msg) = self.assistant(state) {
                    msg.set_sql(&sql);
                }
                sink.emit(EngineEvent::Sql { sql });
            }
            StreamEvent::Data(result) => {
                self.pending_result = Some(result);
            }
            StreamEvent::Chart(chart) => {
                if let Some(msg) = self.assistant(state) {
                    msg.attach_chart(&chart);
                }
                let artifact = VisualArtifact::from_chart(chart, self.pending_result.take());
                self.add_artifact(state, artifact, sink);
            }
            StreamEvent::Error(text) => {
                let text = if text.is_empty() { UNKNOWN_ERROR.to_string() } else { text };
                if let Some(msg) = self.assistant(state) {
                    msg.append_text(&format!("\n\n**Error**: {text}"));
                }
                sink.emit(EngineEvent::ErrorAnnotation { message: text });
            }
            StreamEvent::Done => {
                if let Some(result) = self.pending_result.take().filter(|r| !r.is_empty()) {
                    self.add_artifact(state, VisualArtifact::fallback(result), sink);
                }
                state.end_turn(self.id);
                tracing::info!(turn = %self.id, session_id = %self.session_id, "turn finished");
                sink.emit(EngineEvent::TurnFinished {
                    session_id: self.session_id.clone(),
                    turn: self.id,
                });
                return TurnStep::Finished;
            }
        }
        TurnStep::Continue
    }

    /// End the turn without `done`. The notice is added only when nothing
    /// was streamed into the answer.
    pub fn abort(mut self, state: &mut AppState, reason: &str, sink: &EventSink) {
        self.pending_result = None;
        if let Some(msg) = self.assistant(state) {
            if msg.content.is_empty() {
                msg.append_text(CONNECTION_FAILED_NOTICE);
            }
        }
        state.end_turn(self.id);
        tracing::debug!(turn = %self.id, session_id = %self.session_id, reason, "turn aborted");
        sink.emit(EngineEvent::TurnAborted {
            session_id: self.session_id,
            turn: self.id,
            reason: reason.to_string(),
        });
    }

    fn add_artifact(&self, state: &mut AppState, artifact: VisualArtifact, sink: &EventSink) {
        tracing::debug!(artifact_id = %artifact.id, kind = %artifact.active_kind, "artifact added");
        state.artifacts.push(&self.session_id, artifact.clone());
        sink.emit(EngineEvent::ArtifactAdded {
            session_id: self.session_id.clone(),
            artifact,
        });
    }
}
