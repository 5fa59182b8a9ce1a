use std::fmt;

use analyst_core::error::AnalystError;
use serde::Serialize;

use crate::artifacts::ArtifactRegistry;
use crate::sessions::SessionRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TurnId(pub u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

/// At most one turn streams at a time, across all sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    Streaming(TurnId),
}

/// Everything the client knows locally: sessions, transcripts, artifacts and
/// whether a turn is in flight.
#[derive(Debug, Default)]
pub struct AppState {
    pub(crate) sessions: SessionRegistry,
    pub(crate) artifacts: ArtifactRegistry,
    turn_state: TurnState,
    next_turn: u64,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn artifacts(&self) -> &ArtifactRegistry {
        &self.artifacts
    }

    pub fn turn_state(&self) -> TurnState {
        self.turn_state
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.turn_state, TurnState::Streaming(_))
    }

    /// Idle -> Streaming. Rejected while another turn is streaming.
    pub(crate) fn start_turn(&mut self) -> Result<TurnId, AnalystError> {
        if let TurnState::Streaming(active) = self.turn_state {
            tracing::debug!(%active, "rejecting turn start while streaming");
            return Err(AnalystError::TurnInProgress);
        }
        self.next_turn += 1;
        let id = TurnId(self.next_turn);
        self.turn_state = TurnState::Streaming(id);
        Ok(id)
    }

    /// Streaming -> Idle, only for the turn that is actually active.
    pub(crate) fn end_turn(&mut self, id: TurnId) {
        if self.turn_state == TurnState::Streaming(id) {
            self.turn_state = TurnState::Idle;
        }
    }
}
