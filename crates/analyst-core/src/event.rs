use serde::Deserialize;
use serde_json::Value;

use crate::chart::ChartSpec;
use crate::error::EventParseError;
use crate::query::QueryResult;

/// One event of a query turn's stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Text(String),
    Sql(String),
    Data(QueryResult),
    Chart(ChartSpec),
    Error(String),
    Done,
}

/// Wire shape: `{"type": ..., "content": ..., "config": ...}`
#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    config: Option<Value>,
}

impl StreamEvent {
    /// Decode one streamed payload.
    ///
    /// Missing or non-string text payloads read as empty; `data` and `chart`
    /// must carry a payload of the right shape.
    pub fn parse(payload: &str) -> Result<Self, EventParseError> {
        let raw: RawEvent =
            serde_json::from_str(payload).map_err(|e| EventParseError::Json(e.to_string()))?;

        match raw.kind.as_str() {
            "text" => Ok(StreamEvent::Text(text_of(raw.content))),
            "sql" => Ok(StreamEvent::Sql(text_of(raw.content))),
            "error" => Ok(StreamEvent::Error(text_of(raw.content))),
            "done" => Ok(StreamEvent::Done),
            "data" => {
                let content = raw.content.filter(|c| !c.is_null()).ok_or(EventParseError::MissingPayload {
                    kind: raw.kind.clone(),
                    field: "content",
                })?;
                serde_json::from_value(content)
                    .map(StreamEvent::Data)
                    .map_err(|e| EventParseError::Json(format!("data: {e}")))
            }
            "chart" => {
                let config = raw.config.filter(|c| !c.is_null()).ok_or(EventParseError::MissingPayload {
                    kind: raw.kind.clone(),
                    field: "config",
                })?;
                serde_json::from_value(config)
                    .map(StreamEvent::Chart)
                    .map_err(|e| EventParseError::Json(format!("chart: {e}")))
            }
            other => Err(EventParseError::UnknownType(other.to_string())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Text(_) => "text",
            StreamEvent::Sql(_) => "sql",
            StreamEvent::Data(_) => "data",
            StreamEvent::Chart(_) => "chart",
            StreamEvent::Error(_) => "error",
            StreamEvent::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done)
    }
}

fn text_of(content: Option<Value>) -> String {
    match content {
        Some(Value::String(s)) => s,
        _ => String::new(),
    }
}
