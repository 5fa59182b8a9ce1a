use std::collections::HashMap;

use analyst_core::chart::{ChartKind, VisualArtifact};
use analyst_core::message::Message;

/// Per-session, append-only list of artifacts in creation order.
#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    by_session: HashMap<String, Vec<VisualArtifact>>,
}

impl ArtifactRegistry {
    pub fn list(&self, session_id: &str) -> &[VisualArtifact] {
        self.by_session
            .get(session_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get(&self, session_id: &str, artifact_id: &str) -> Option<&VisualArtifact> {
        self.list(session_id).iter().find(|a| a.id == artifact_id)
    }

    pub(crate) fn push(&mut self, session_id: &str, artifact: VisualArtifact) {
        self.by_session
            .entry(session_id.to_string())
            .or_default()
            .push(artifact);
    }

    pub(crate) fn replace(&mut self, session_id: &str, artifacts: Vec<VisualArtifact>) {
        self.by_session.insert(session_id.to_string(), artifacts);
    }

    pub(crate) fn remove_session(&mut self, session_id: &str) {
        self.by_session.remove(session_id);
    }

    /// Returns `false` when the artifact is unknown or already shows `kind`.
    pub(crate) fn switch_kind(&mut self, session_id: &str, artifact_id: &str, kind: ChartKind) -> bool {
        self.by_session
            .get_mut(session_id)
            .and_then(|list| list.iter_mut().find(|a| a.id == artifact_id))
            .is_some_and(|artifact| artifact.switch_kind(kind))
    }
}

/// Artifacts recoverable from a loaded transcript, one per message whose
/// persisted chart still decodes. Raw rows are not persisted.
pub fn from_history(messages: &[Message]) -> Vec<VisualArtifact> {
    messages
        .iter()
        .filter_map(Message::chart)
        .map(VisualArtifact::from_history)
        .collect()
}
