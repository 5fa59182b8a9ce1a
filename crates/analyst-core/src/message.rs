use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chart::ChartSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sql_query: Option<String>,
    /// Id of the chart produced by this turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_ref: Option<String>,
    /// The chart as the backend persists it: a JSON-encoded [`ChartSpec`]
    #[serde(default)]
    pub chart_config: Option<String>,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new_user(session_id: String, content: String) -> Self {
        Self::new(session_id, MessageRole::User, content)
    }

    /// Empty placeholder filled in by a streaming turn
    pub fn new_assistant(session_id: String) -> Self {
        Self::new(session_id, MessageRole::Assistant, String::new())
    }

    fn new(session_id: String, role: MessageRole, content: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id,
            role,
            content,
            sql_query: None,
            chart_ref: None,
            chart_config: None,
            created_at: Utc::now(),
        }
    }

    pub fn append_text(&mut self, delta: &str) {
        self.content.push_str(delta);
    }

    pub fn set_sql(&mut self, sql: &str) {
        self.sql_query = (!sql.is_empty()).then(|| sql.to_string());
    }

    pub fn attach_chart(&mut self, chart: &ChartSpec) {
        self.chart_ref = Some(chart.id.clone());
        self.chart_config = serde_json::to_string(chart).ok();
    }

    /// Decode the persisted chart, if any. Undecodable configs yield `None`.
    pub fn chart(&self) -> Option<ChartSpec> {
        let raw = self.chart_config.as_deref().filter(|s| !s.trim().is_empty())?;
        match serde_json::from_str::<ChartSpec>(raw) {
            Ok(chart) => Some(chart),
            Err(e) => {
                tracing::debug!(message_id = %self.id, "skipping undecodable chart_config: {e}");
                None
            }
        }
    }
}
