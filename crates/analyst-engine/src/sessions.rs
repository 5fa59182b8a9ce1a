use std::collections::HashMap;

use analyst_core::error::AnalystError;
use analyst_core::message::Message;
use analyst_core::session::Session;

/// Session list, current selection and cached transcripts.
///
/// Only local bookkeeping lives here; the engine calls the backend first and
/// applies the successful response.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Vec<Session>,
    current: Option<String>,
    transcripts: HashMap<String, Vec<Message>>,
}

impl SessionRegistry {
    pub fn list(&self) -> &[Session] {
        &self.sessions
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&Session> {
        self.current_id().and_then(|id| self.get(id))
    }

    /// Cached transcript; empty when the session was never loaded.
    pub fn transcript(&self, id: &str) -> &[Message] {
        self.transcripts.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.transcripts.contains_key(id)
    }

    pub(crate) fn replace_all(&mut self, sessions: Vec<Session>) {
        self.sessions = sessions;
    }

    /// A freshly created session goes first, becomes current and starts empty.
    pub(crate) fn insert_created(&mut self, session: Session) {
        self.current = Some(session.id.clone());
        self.transcripts.insert(session.id.clone(), Vec::new());
        self.sessions.retain(|s| s.id != session.id);
        self.sessions.insert(0, session);
    }

    /// Take title and `updated_at` from the server's copy.
    pub(crate) fn apply_rename(&mut self, id: &str, renamed: &Session) -> bool {
        match self.sessions.iter_mut().find(|s| s.id == id) {
            Some(session) => {
                session.title = renamed.title.clone();
                session.updated_at = renamed.updated_at;
                true
            }
            None => false,
        }
    }

    /// Drop a session and its transcript. When it was current, the first
    /// remaining session takes over.
    pub(crate) fn remove(&mut self, id: &str) {
        self.sessions.retain(|s| s.id != id);
        self.transcripts.remove(id);
        if self.current.as_deref() == Some(id) {
            self.current = self.sessions.first().map(|s| s.id.clone());
        }
    }

    pub(crate) fn set_current(&mut self, id: &str) -> Result<(), AnalystError> {
        if self.get(id).is_none() {
            return Err(AnalystError::SessionNotFound(id.to_string()));
        }
        self.current = Some(id.to_string());
        Ok(())
    }

    pub(crate) fn cache_transcript(&mut self, id: &str, messages: Vec<Message>) {
        self.transcripts.insert(id.to_string(), messages);
    }

    /// Append a message, returning its index in the transcript.
    pub(crate) fn push_message(&mut self, id: &str, message: Message) -> usize {
        let transcript = self.transcripts.entry(id.to_string()).or_default();
        transcript.push(message);
        transcript.len() - 1
    }

    pub(crate) fn message_mut(&mut self, id: &str, index: usize) -> Option<&mut Message> {
        self.transcripts.get_mut(id).and_then(|t| t.get_mut(index))
    }
}
