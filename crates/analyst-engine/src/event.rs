use analyst_core::chart::VisualArtifact;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::state::TurnId;

/// Progress of a query turn, published for front ends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    TurnStarted {
        session_id: String,
        turn: TurnId,
    },
    TextDelta {
        text: String,
    },
    Sql {
        sql: String,
    },
    ArtifactAdded {
        session_id: String,
        artifact: VisualArtifact,
    },
    ErrorAnnotation {
        message: String,
    },
    TurnFinished {
        session_id: String,
        turn: TurnId,
    },
    TurnAborted {
        session_id: String,
        turn: TurnId,
        reason: String,
    },
}

/// Optional subscriber of [`EngineEvent`]s. Sends never block, and a dropped
/// receiver is not an error.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<EngineEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn emit(&self, event: EngineEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
