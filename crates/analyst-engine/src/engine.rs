use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use analyst_core::backend::{Backend, EventStream, TableDetail, TableInfo, UploadResult};
use analyst_core::chart::{ChartKind, VisualArtifact};
use analyst_core::config::AppConfig;
use analyst_core::error::{AnalystError, TransportError};
use analyst_core::event::StreamEvent;
use analyst_core::message::Message;
use analyst_core::session::Session;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::artifacts;
use crate::event::{EngineEvent, EventSink};
use crate::reducer::{Turn, TurnStep};
use crate::state::AppState;

/// What a completed turn produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub session_id: String,
    pub artifacts_added: usize,
}

/// Drives the backend and owns all local state.
///
/// Every operation takes `&mut self`, so handlers never interleave and a
/// turn's events are folded strictly in arrival order.
pub struct Engine {
    backend: Arc<dyn Backend>,
    config: AppConfig,
    state: AppState,
    sink: EventSink,
}

impl Engine {
    pub fn new(backend: Arc<dyn Backend>, config: AppConfig) -> Self {
        Self {
            backend,
            config,
            state: AppState::new(),
            sink: EventSink::default(),
        }
    }

    /// Route [`EngineEvent`]s to a new receiver, replacing any previous one.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<EngineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sink = EventSink::new(tx);
        rx
    }

    /// Drop the current subscriber; its receiver sees the channel close.
    pub fn unsubscribe(&mut self) {
        self.sink = EventSink::default();
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.state.sessions.current()
    }

    pub fn transcript(&self, session_id: &str) -> &[Message] {
        self.state.sessions.transcript(session_id)
    }

    pub fn artifacts(&self, session_id: &str) -> &[VisualArtifact] {
        self.state.artifacts.list(session_id)
    }

    /// Load the session list and open the most recent session, if any.
    pub async fn init(&mut self) -> Result<(), AnalystError> {
        self.refresh_sessions().await?;
        let first = self.state.sessions.list().first().map(|s| s.id.clone());
        if let Some(id) = first {
            self.select_session(&id).await?;
        }
        Ok(())
    }

    pub async fn refresh_sessions(&mut self) -> Result<(), AnalystError> {
        match self.backend.list_sessions().await {
            Ok(sessions) => {
                tracing::debug!(count = sessions.len(), "session list refreshed");
                self.state.sessions.replace_all(sessions);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to list sessions: {e}");
                Err(e.into())
            }
        }
    }

    /// Make `id` current, loading its transcript unless already cached.
    pub async fn select_session(&mut self, id: &str) -> Result<(), AnalystError> {
        self.state.sessions.set_current(id)?;
        if self.state.sessions.is_loaded(id) {
            return Ok(());
        }

        let messages = self.backend.list_messages(id).await.map_err(|e| {
            tracing::warn!(session_id = id, "Failed to load messages: {e}");
            AnalystError::from(e)
        })?;

        let restored = artifacts::from_history(&messages);
        tracing::debug!(session_id = id, messages = messages.len(), artifacts = restored.len(), "transcript loaded");
        if !restored.is_empty() {
            self.state.artifacts.replace(id, restored);
        }
        self.state.sessions.cache_transcript(id, messages);
        Ok(())
    }

    /// Create a session (blank titles fall back to the configured default)
    /// and make it current.
    pub async fn create_session(&mut self, title: Option<&str>) -> Result<Session, AnalystError> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(self.config.default_session_title.as_str())
            .to_string();

        let session = self.backend.create_session(Some(&title)).await.map_err(|e| {
            tracing::warn!("Failed to create session: {e}");
            AnalystError::from(e)
        })?;
        self.state.sessions.insert_created(session.clone());
        Ok(session)
    }

    /// Rename a session. A blank title is ignored and returns `Ok(None)`.
    pub async fn rename_session(&mut self, id: &str, title: &str) -> Result<Option<Session>, AnalystError> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(None);
        }

        let renamed = self.backend.rename_session(id, title).await.map_err(|e| {
            tracing::warn!(session_id = id, "Failed to rename session: {e}");
            AnalystError::from(e)
        })?;
        if !self.state.sessions.apply_rename(id, &renamed) {
            tracing::debug!(session_id = id, "renamed session is not in the local list");
        }
        Ok(Some(renamed))
    }

    pub async fn delete_session(&mut self, id: &str) -> Result<(), AnalystError> {
        self.backend.delete_session(id).await.map_err(|e| {
            tracing::warn!(session_id = id, "Failed to delete session: {e}");
            AnalystError::from(e)
        })?;
        self.state.sessions.remove(id);
        self.state.artifacts.remove_session(id);
        Ok(())
    }

    /// Change how an artifact is drawn. Returns `false` when nothing changed.
    pub fn switch_artifact_kind(&mut self, session_id: &str, artifact_id: &str, kind: ChartKind) -> bool {
        let changed = self.state.artifacts.switch_kind(session_id, artifact_id, kind);
        tracing::debug!(session_id, artifact_id, %kind, changed, "switch artifact kind");
        changed
    }

    pub async fn list_tables(&self) -> Result<Vec<TableInfo>, AnalystError> {
        Ok(self.backend.list_tables().await?)
    }

    pub async fn table_detail(&self, name: &str, limit: u32) -> Result<TableDetail, AnalystError> {
        Ok(self.backend.table_detail(name, limit).await?)
    }

    pub async fn upload_csv(&self, path: &Path, table_name: Option<&str>) -> Result<UploadResult, AnalystError> {
        match self.backend.upload_csv(path, table_name).await {
            Ok(result) => {
                tracing::info!(table = %result.table_name, rows = result.rows_inserted, "CSV imported");
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to upload CSV: {e}");
                Err(e.into())
            }
        }
    }

    /// Ask a question in the current session, creating one titled after the
    /// question when none is selected, and stream the answer into the state.
    ///
    /// Blank input does nothing and yields `Ok(None)`. When the stream fails,
    /// stalls, ends early or `cancel` fires, the turn is aborted in the state
    /// and the cause is returned.
    pub async fn send_message(
        &mut self,
        content: &str,
        cancel: CancellationToken,
    ) -> Result<Option<TurnReport>, AnalystError> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }
        if self.state.is_streaming() {
            return Err(AnalystError::TurnInProgress);
        }

        let session_id = match self.state.sessions.current_id() {
            Some(id) => id.to_string(),
            None => {
                let title: String = content.chars().take(self.config.implicit_title_chars).collect();
                self.create_session(Some(&title)).await?.id
            }
        };

        let mut turn = Turn::begin(&mut self.state, &session_id, content, &self.sink)?;
        let artifacts_before = self.state.artifacts.list(&session_id).len();

        let mut stream = match self.backend.stream_query(&session_id, content).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(session_id = %session_id, "Failed to open query stream: {e}");
                turn.abort(&mut self.state, &e.to_string(), &self.sink);
                return Err(e.into());
            }
        };

        let idle_timeout = self.config.stream.idle_timeout();
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    turn.abort(&mut self.state, "cancelled", &self.sink);
                    return Err(AnalystError::Cancelled);
                }
                next = next_payload(&mut stream, idle_timeout) => next,
            };

            let payload = match next {
                Ok(Some(Ok(payload))) => payload,
                Ok(Some(Err(e))) | Err(e) => {
                    tracing::warn!(session_id = %session_id, "Query stream failed: {e}");
                    turn.abort(&mut self.state, &e.to_string(), &self.sink);
                    return Err(e.into());
                }
                Ok(None) => {
                    let e = TransportError::Stream("stream ended before done".into());
                    tracing::warn!(session_id = %session_id, "{e}");
                    turn.abort(&mut self.state, &e.to_string(), &self.sink);
                    return Err(e.into());
                }
            };

            let event = match StreamEvent::parse(&payload) {
                Ok(event) => event,
                Err(e) => {
                    tracing::debug!("dropping malformed event: {e}");
                    continue;
                }
            };

            if turn.apply(&mut self.state, event, &self.sink) == TurnStep::Finished {
                break;
            }
        }
        drop(stream);

        let artifacts_added = self.state.artifacts.list(&session_id).len() - artifacts_before;
        // Titles and timestamps may have changed server-side; already logged on failure
        let _ = self.refresh_sessions().await;

        Ok(Some(TurnReport {
            session_id,
            artifacts_added,
        }))
    }
}

/// Next raw payload, bounded by the idle timeout when one is configured.
async fn next_payload(
    stream: &mut EventStream,
    idle_timeout: Option<Duration>,
) -> Result<Option<Result<String, TransportError>>, TransportError> {
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, stream.next())
            .await
            .map_err(|_| TransportError::Timeout(limit.as_secs())),
        None => Ok(stream.next().await),
    }
}
