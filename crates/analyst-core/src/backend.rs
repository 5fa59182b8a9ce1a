use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::pin::Pin;

use crate::error::TransportError;
use crate::message::Message;
use crate::session::Session;

/// Raw payloads of one turn's channel, in arrival order.
///
/// Each item is the text of a single server-sent event; decoding into
/// [`crate::event::StreamEvent`] is left to the consumer.
pub type EventStream =
    Pin<Box<dyn futures_core::Stream<Item = Result<String, TransportError>> + Send>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    #[serde(rename = "type", default)]
    pub column_type: String,
    #[serde(default)]
    pub notnull: bool,
    #[serde(default)]
    pub pk: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<TableColumn>,
    #[serde(default)]
    pub row_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDetail {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<TableColumn>,
    #[serde(default)]
    pub row_count: u64,
    #[serde(default)]
    pub sample_data: Vec<serde_json::Value>,
}

/// Outcome of a CSV import into the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    #[serde(default)]
    pub detail: String,
    pub table_name: String,
    #[serde(default)]
    pub rows_inserted: u64,
}

/// The remote analysis service.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_sessions(&self) -> Result<Vec<Session>, TransportError>;

    async fn create_session(&self, title: Option<&str>) -> Result<Session, TransportError>;

    async fn rename_session(&self, id: &str, title: &str) -> Result<Session, TransportError>;

    async fn delete_session(&self, id: &str) -> Result<(), TransportError>;

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, TransportError>;

    /// Submit a question and open its event channel.
    async fn stream_query(&self, session_id: &str, message: &str) -> Result<EventStream, TransportError>;

    async fn list_tables(&self) -> Result<Vec<TableInfo>, TransportError>;

    async fn table_detail(&self, name: &str, limit: u32) -> Result<TableDetail, TransportError>;

    /// Import a CSV file, creating or appending to `table_name` (the server
    /// derives it from the file name when absent).
    async fn upload_csv(&self, path: &Path, table_name: Option<&str>) -> Result<UploadResult, TransportError>;
}
