use analyst_core::backend::{Backend, EventStream, TableDetail, TableInfo, UploadResult};
use analyst_core::config::AppConfig;
use analyst_core::error::TransportError;
use analyst_core::message::Message;
use analyst_core::session::Session;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::sse::SseDecoder;

/// [`Backend`] over the analysis service's REST and SSE endpoints.
pub struct HttpBackend {
    client: Client,
    api_root: Url,
    request_timeout: Option<Duration>,
}

#[derive(Deserialize)]
struct TablesResponse {
    tables: Vec<TableInfo>,
}

impl HttpBackend {
    /// `request_timeout` bounds each REST call; `None` leaves them unbounded.
    pub fn new(api_root: &str, request_timeout: Option<Duration>) -> Result<Self, TransportError> {
        let api_root = Url::parse(api_root.trim_end_matches('/'))
            .map_err(|e| TransportError::Http(format!("invalid API root '{api_root}': {e}")))?;
        if api_root.cannot_be_a_base() {
            return Err(TransportError::Http(format!("API root cannot carry a path: {api_root}")));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self {
            client,
            api_root,
            request_timeout,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, TransportError> {
        Self::new(&config.api_root(), config.request_timeout())
    }

    pub fn api_root(&self) -> &str {
        self.api_root.as_str()
    }

    /// API root plus `segments`, each percent-encoded as one path segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_root.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a REST request under the configured timeout and reject non-2xx replies.
    async fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        let request = match self.request_timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        };
        let resp = request.send().await.map_err(|e| self.map_reqwest_error(e))?;
        check_status(resp).await
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, TransportError> {
        let url = self.endpoint(segments);
        tracing::debug!(%url, "GET");
        let resp = self.send(self.client.get(url)).await?;
        decode(resp).await
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> TransportError {
        match self.request_timeout {
            Some(timeout) if e.is_timeout() => TransportError::Timeout(timeout.as_secs()),
            _ => TransportError::Http(e.to_string()),
        }
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, TransportError> {
    resp.json()
        .await
        .map_err(|e| TransportError::Decode(e.to_string()))
}

/// Map a non-success response to [`TransportError::Api`], preferring the
/// server's `{"detail": ...}` message over the raw body.
async fn check_status(resp: Response) -> Result<Response, TransportError> {
    if resp.status().is_success() {
        return Ok(resp);
    }

    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or(text);
    Err(TransportError::Api { status, message })
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_sessions(&self) -> Result<Vec<Session>, TransportError> {
        self.get_json(&["sessions"]).await
    }

    async fn create_session(&self, title: Option<&str>) -> Result<Session, TransportError> {
        let body = match title {
            Some(title) => serde_json::json!({ "title": title }),
            None => serde_json::json!({}),
        };
        let resp = self
            .send(self.client.post(self.endpoint(&["sessions"])).json(&body))
            .await?;
        decode(resp).await
    }

    async fn rename_session(&self, id: &str, title: &str) -> Result<Session, TransportError> {
        let resp = self
            .send(
                self.client
                    .put(self.endpoint(&["sessions", id]))
                    .json(&serde_json::json!({ "title": title })),
            )
            .await?;
        decode(resp).await
    }

    async fn delete_session(&self, id: &str) -> Result<(), TransportError> {
        self.send(self.client.delete(self.endpoint(&["sessions", id])))
            .await?;
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, TransportError> {
        self.get_json(&["sessions", session_id, "messages"]).await
    }

    async fn stream_query(&self, session_id: &str, message: &str) -> Result<EventStream, TransportError> {
        let body = serde_json::json!({
            "session_id": session_id,
            "message": message,
        });

        tracing::debug!(session_id, "opening query stream");
        // No request timeout here: a stalled stream is bounded by the caller
        let resp = self
            .client
            .post(self.endpoint(&["chat", "stream"]))
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let resp = check_status(resp).await?;

        let byte_stream = resp.bytes_stream();

        let stream = async_stream::stream! {
            use tokio_stream::StreamExt;

            let mut byte_stream = Box::pin(byte_stream);
            let mut decoder = SseDecoder::new();
            let mut failed = false;

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(TransportError::Stream(e.to_string()));
                        failed = true;
                        break;
                    }
                };

                for payload in decoder.feed(&chunk) {
                    yield Ok(payload);
                }
            }

            if !failed {
                if let Some(payload) = decoder.finish() {
                    yield Ok(payload);
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn list_tables(&self) -> Result<Vec<TableInfo>, TransportError> {
        let resp: TablesResponse = self.get_json(&["data", "tables"]).await?;
        Ok(resp.tables)
    }

    async fn table_detail(&self, name: &str, limit: u32) -> Result<TableDetail, TransportError> {
        let request = self
            .client
            .get(self.endpoint(&["data", "tables", name]))
            .query(&[("limit", limit)]);
        decode(self.send(request).await?).await
    }

    async fn upload_csv(&self, path: &Path, table_name: Option<&str>) -> Result<UploadResult, TransportError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TransportError::File(format!("not a file path: {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| TransportError::File(format!("{}: {e}", path.display())))?;

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/csv")
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let form = Form::new().part("file", part);

        let mut request = self
            .client
            .post(self.endpoint(&["data", "upload"]))
            .multipart(form);
        if let Some(table) = table_name.map(str::trim).filter(|t| !t.is_empty()) {
            request = request.query(&[("table_name", table)]);
        }

        tracing::debug!(path = %path.display(), table_name, "uploading CSV");
        decode(self.send(request).await?).await
    }
}
